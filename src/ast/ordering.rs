/// One key of an `order_by`: a field name and a direction.
///
/// # Examples
/// ```text
/// "a"              // ascending by field a
/// ("a", false)     // descending by field a
/// asc("a")         // ascending, explicit
/// desc("a")        // descending
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub ascending: bool,
}

impl OrderKey {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderKey {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderKey {
            field: field.into(),
            ascending: false,
        }
    }
}

impl From<&str> for OrderKey {
    fn from(field: &str) -> Self {
        OrderKey::asc(field)
    }
}

impl From<String> for OrderKey {
    fn from(field: String) -> Self {
        OrderKey::asc(field)
    }
}

impl From<(&str, bool)> for OrderKey {
    fn from((field, ascending): (&str, bool)) -> Self {
        OrderKey {
            field: field.to_string(),
            ascending,
        }
    }
}
