//! Form field value objects

/// A single labeled text input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Key used when the field is serialized
    pub name: String,
    /// Label shown next to the input
    pub label: String,
    /// Generated element id, unique within its container
    pub element_id: String,
    value: String,
    pub is_multiline: bool,
}

impl FormField {
    /// Create a new empty text field
    pub fn text(name: &str, label: &str, is_multiline: bool) -> Self {
        Self::text_with_value(name, label, String::new(), is_multiline)
    }

    /// Create a new text field with initial value
    pub fn text_with_value(name: &str, label: &str, value: String, is_multiline: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            element_id: name.to_string(),
            value,
            is_multiline,
        }
    }

    /// Override the generated element id
    pub fn with_element_id(mut self, element_id: String) -> Self {
        self.element_id = element_id;
        self
    }

    pub fn as_text(&self) -> &str {
        &self.value
    }

    pub fn set_text(&mut self, value: String) {
        self.value = value;
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Push a character to the field value
    pub fn push_char(&mut self, c: char) {
        if c == '\n' && !self.is_multiline {
            return;
        }
        self.value.push(c);
    }

    /// Remove the last character from the field value
    pub fn pop_char(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// Get the display value for rendering
    pub fn display_value(&self) -> String {
        if self.is_multiline {
            self.value.clone()
        } else {
            self.value.replace('\n', " ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_starts_empty() {
        let field = FormField::text("email", "Email", false);
        assert!(field.is_empty());
        assert_eq!(field.element_id, "email");
    }

    #[test]
    fn test_push_and_pop() {
        let mut field = FormField::text("name", "Name", false);
        field.push_char('A');
        field.push_char('b');
        assert_eq!(field.as_text(), "Ab");
        field.pop_char();
        assert_eq!(field.as_text(), "A");
    }

    #[test]
    fn test_single_line_ignores_newline() {
        let mut field = FormField::text("name", "Name", false);
        field.push_char('\n');
        assert!(field.is_empty());
    }

    #[test]
    fn test_multiline_accepts_newline() {
        let mut field = FormField::text("message", "Message", true);
        field.push_char('a');
        field.push_char('\n');
        field.push_char('b');
        assert_eq!(field.display_value(), "a\nb");
    }

    #[test]
    fn test_clear() {
        let mut field = FormField::text_with_value("cash", "Cash", "100".to_string(), false);
        field.clear();
        assert!(field.is_empty());
    }

    #[test]
    fn test_with_element_id() {
        let field = FormField::text("Cash at bank", "Cash at bank", false)
            .with_element_id("bs__Cash_at_bank".to_string());
        assert_eq!(field.element_id, "bs__Cash_at_bank");
        assert_eq!(field.label, "Cash at bank");
    }
}
