use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMBER_RE: Regex = Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap();
}

/// Replaces every digit run (optionally with one decimal point) by its
/// spoken-word form: "12.5" becomes "twelve point five". Runs that fail to
/// parse are left as-is.
pub fn convert_numbers_to_words(text: &str) -> String {
    NUMBER_RE
        .replace_all(text, |caps: &regex::Captures| {
            let token = &caps[0];
            spell_token(token).unwrap_or_else(|| token.to_string())
        })
        .into_owned()
}

fn spell_token(token: &str) -> Option<String> {
    if let Some((integer, fraction)) = token.split_once('.') {
        let integer = spell_integer(integer.parse().ok()?);
        let fraction = spell_integer(fraction.parse().ok()?);
        Some(format!("{} point {}", integer, fraction))
    } else {
        Some(spell_integer(token.parse().ok()?))
    }
}

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

fn spell_integer(num: u64) -> String {
    match num {
        0..=19 => ONES[num as usize].to_string(),
        20..=99 => {
            let tens = TENS[(num / 10) as usize];
            if num % 10 == 0 {
                tens.to_string()
            } else {
                format!("{}-{}", tens, ONES[(num % 10) as usize])
            }
        }
        100..=999 => {
            let head = format!("{} hundred", ONES[(num / 100) as usize]);
            if num % 100 == 0 {
                head
            } else {
                format!("{} {}", head, spell_integer(num % 100))
            }
        }
        _ => {
            for (scale, name) in SCALES {
                if num >= scale {
                    let head = format!("{} {}", spell_integer(num / scale), name);
                    return if num % scale == 0 {
                        head
                    } else {
                        format!("{} {}", head, spell_integer(num % scale))
                    };
                }
            }
            num.to_string()
        }
    }
}
