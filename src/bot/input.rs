//! Free-text input parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::ledger::{LedgerError, LedgerResult, MAX_AMOUNT};

const PROOF_MAX_CHARS: usize = 500;

/// Plain ASCII digits, or digits grouped by thousands with `,` or `_`.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+|[0-9]{1,3}(,[0-9]{3})+|[0-9]{1,3}(_[0-9]{3})+)$").expect("static regex"));

/// Fold Persian and Arabic-Indic digits to ASCII.
fn fold_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

/// Parse a whole, non-negative amount in toman.
pub fn parse_amount(text: &str) -> LedgerResult<i64> {
    let folded = fold_digits(text.trim());
    if !AMOUNT_RE.is_match(&folded) {
        return Err(LedgerError::InvalidInput("please send a whole number, e.g. 150000".to_string()));
    }
    let digits: String = folded.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<i64>() {
        Ok(amount) if amount <= MAX_AMOUNT => Ok(amount),
        _ => Err(LedgerError::InvalidInput("amount is too large".to_string())),
    }
}

/// Parse a percentage. Range checks are left to the store.
pub fn parse_percent(text: &str) -> LedgerResult<i64> {
    let folded = fold_digits(text.trim());
    let folded = folded.strip_suffix('%').unwrap_or(&folded).trim();
    folded
        .parse::<i64>()
        .map_err(|_| LedgerError::InvalidInput("please send a number between 0 and 100".to_string()))
}

/// A single token such as a wallet address or voucher code.
pub fn parse_token(text: &str, what: &str) -> LedgerResult<String> {
    let text = text.trim();
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return Err(LedgerError::InvalidInput(format!("{what} must be a single word without spaces")));
    }
    Ok(text.to_string())
}

/// Free-form payment proof: a transaction hash, a link, or both.
pub fn parse_proof(text: &str) -> LedgerResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LedgerError::InvalidInput("proof must not be empty".to_string()));
    }
    if text.chars().count() > PROOF_MAX_CHARS {
        return Err(LedgerError::InvalidInput(format!("proof must be at most {PROOF_MAX_CHARS} characters")));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_grouped_amounts() {
        assert_eq!(parse_amount("150000").unwrap(), 150_000);
        assert_eq!(parse_amount("  5000 ").unwrap(), 5_000);
        assert_eq!(parse_amount("1,500,000").unwrap(), 1_500_000);
        assert_eq!(parse_amount("500_000").unwrap(), 500_000);
    }

    #[test]
    fn test_persian_digits() {
        assert_eq!(parse_amount("۱۵۰۰۰۰").unwrap(), 150_000);
        assert_eq!(parse_amount("٥٠٠٠").unwrap(), 5_000);
    }

    #[test]
    fn test_rejects_non_numeric() {
        for text in ["", "abc", "-5000", "12.5", "1,50,000", "5 000", "١٠x", "5०००००", "१२३"] {
            assert!(matches!(parse_amount(text), Err(LedgerError::InvalidInput(_))), "{text}");
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_amount("99999999999999999999999").is_err());
        assert!(parse_amount(&(MAX_AMOUNT + 1).to_string()).is_err());
        assert_eq!(parse_amount(&MAX_AMOUNT.to_string()).unwrap(), MAX_AMOUNT);
    }

    #[test]
    fn test_percent() {
        assert_eq!(parse_percent("65").unwrap(), 65);
        assert_eq!(parse_percent("40%").unwrap(), 40);
        assert_eq!(parse_percent("-3").unwrap(), -3);
        assert!(parse_percent("half").is_err());
    }

    #[test]
    fn test_token() {
        assert_eq!(parse_token("  TXabc ", "address").unwrap(), "TXabc");
        assert!(parse_token("two words", "address").is_err());
        assert!(parse_token("   ", "code").is_err());
    }

    #[test]
    fn test_proof_accepts_hash_and_link() {
        let proof = parse_proof(" hash 0xabc link https://tronscan.org/#/tx/0xabc \n").unwrap();
        assert_eq!(proof, "hash 0xabc link https://tronscan.org/#/tx/0xabc");
        assert!(parse_proof("  ").is_err());
        assert!(parse_proof(&"x".repeat(PROOF_MAX_CHARS + 1)).is_err());
    }
}
