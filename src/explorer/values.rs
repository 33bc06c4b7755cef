use serde::{Deserialize, Serialize};

use crate::sitemap::{Element, ElementKind};

// ============================================================================
// Field classification
// ============================================================================

/// Semantic type of an input element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Email,
    Password,
    Number,
    Date,
    Tel,
    Url,
    Search,
    Name,
    Postal,
}

/// Field type from the declared input type, falling back to the label.
pub fn classify_field_type(input_type: Option<&str>, label: &str) -> FieldType {
    // Declared type is the most reliable signal
    if let Some(t) = input_type {
        match t.to_lowercase().as_str() {
            "email" => return FieldType::Email,
            "password" => return FieldType::Password,
            "number" => return FieldType::Number,
            "date" | "datetime-local" | "datetime" => return FieldType::Date,
            "tel" => return FieldType::Tel,
            "url" => return FieldType::Url,
            "search" => return FieldType::Search,
            _ => {}
        }
    }

    let l = label.to_lowercase();
    if l.contains("email") {
        return FieldType::Email;
    }
    if l.contains("password") {
        return FieldType::Password;
    }
    if l.contains("phone") || l.contains("tel") {
        return FieldType::Tel;
    }
    if l.contains("url") || l.contains("website") {
        return FieldType::Url;
    }
    if l.contains("zip") || l.contains("postal") {
        return FieldType::Postal;
    }
    if l.contains("name") || l.contains("user") {
        return FieldType::Name;
    }
    if l.contains("search") || l.contains("query") {
        return FieldType::Search;
    }
    if l.contains("date") {
        return FieldType::Date;
    }
    if l.contains("number") || l.contains("amount") || l.contains("quantity") {
        return FieldType::Number;
    }

    FieldType::Text
}

// ============================================================================
// Test values
// ============================================================================

/// Plausible value for an input with the given label and declared type.
pub fn guess_value(label: &str, input_type: Option<&str>) -> String {
    let l = label.to_lowercase();
    match classify_field_type(input_type, label) {
        FieldType::Email => "user@example.com".into(),
        FieldType::Password => "TestPass123!".into(),
        FieldType::Tel => "555-0100".into(),
        FieldType::Url => "https://example.com".into(),
        FieldType::Postal => "90210".into(),
        FieldType::Name if l.contains("user") => "testuser".into(),
        FieldType::Name => "Jane Doe".into(),
        FieldType::Search => "test query".into(),
        FieldType::Date => "2025-01-15".into(),
        FieldType::Number => "42".into(),
        FieldType::Text => "test".into(),
    }
}

/// Buttons whose click submits the inputs on their screen.
pub fn is_submit_like(element: &Element) -> bool {
    if element.kind != ElementKind::Button {
        return false;
    }
    if element.input_type.as_deref() == Some("submit") {
        return true;
    }
    let l = element.label.to_lowercase();
    ["submit", "save", "sign", "login", "log in", "continue", "next", "search", "send"]
        .iter()
        .any(|k| l.contains(k))
}
