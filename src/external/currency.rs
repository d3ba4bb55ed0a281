/// Stand-in for the platform currency service. The engine only needs
/// existence checks and minor-unit precision for discount rounding.
#[derive(Clone, Default)]
pub struct CurrencyService;

// (code, minor-unit digits)
const SUPPORTED: &[(&str, u32)] = &[
    ("USD", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("CAD", 2),
    ("AUD", 2),
    ("CNY", 2),
    ("JPY", 0),
    ("KRW", 0),
];

impl CurrencyService {
    pub fn new() -> Self {
        Self
    }

    pub fn currency_exists(&self, code: &str) -> bool {
        let code = code.to_ascii_uppercase();
        SUPPORTED.iter().any(|(c, _)| *c == code)
    }

    pub fn minor_unit_precision(&self, code: &str) -> Option<u32> {
        let code = code.to_ascii_uppercase();
        SUPPORTED
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, digits)| *digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_exists_case_insensitive() {
        let svc = CurrencyService::new();
        assert!(svc.currency_exists("usd"));
        assert!(svc.currency_exists("USD"));
        assert!(!svc.currency_exists("XXX"));
    }

    #[test]
    fn test_minor_unit_precision() {
        let svc = CurrencyService::new();
        assert_eq!(svc.minor_unit_precision("USD"), Some(2));
        assert_eq!(svc.minor_unit_precision("JPY"), Some(0));
        assert_eq!(svc.minor_unit_precision("XXX"), None);
    }
}
