use regex::Regex;

/// Replaces emails, dates, phone numbers and capitalised two-word names with
/// placeholder tags. Dates run before phones so ISO dates keep their tag.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    pub fn new() -> Result<Self, regex::Error> {
        let rules = [
            (r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}", "[REDACTED_EMAIL]"),
            (r"\b(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\b", "[REDACTED_DATE]"),
            (r"\b(\d{4}-\d{2}-\d{2})\b", "[REDACTED_DATE]"),
            (r"(\+?\d[\d ()-]{7,}\d)", "[REDACTED_PHONE]"),
            (r"\b([A-Z][a-z]{2,}\s[A-Z][a-z]{2,})\b", "[REDACTED_NAME]"),
        ]
        .into_iter()
        .map(|(pattern, tag)| Regex::new(pattern).map(|re| (re, tag)))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn redact(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |current, (re, tag)| {
                re.replace_all(&current, *tag).into_owned()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_details_are_redacted() -> Result<(), regex::Error> {
        let redactor = Redactor::new()?;
        let redacted = redactor.redact("Call 626-555-0100 or mail jo@example.com");
        assert_eq!(redacted, "Call [REDACTED_PHONE] or mail [REDACTED_EMAIL]");
        Ok(())
    }

    #[test]
    fn dates_and_names_are_redacted() -> Result<(), regex::Error> {
        let redactor = Redactor::new()?;
        let redacted = redactor.redact("seen by Maria Lopez on 3/14/2024, follow up 2024-04-01");
        assert_eq!(
            redacted,
            "seen by [REDACTED_NAME] on [REDACTED_DATE], follow up [REDACTED_DATE]"
        );
        Ok(())
    }

    #[test]
    fn clinical_text_is_untouched() -> Result<(), regex::Error> {
        let redactor = Redactor::new()?;
        let text = "patient has acute rhinitis, take 2 tablets daily";
        assert_eq!(redactor.redact(text), text);
        Ok(())
    }
}
