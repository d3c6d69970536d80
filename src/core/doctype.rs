//! Document type declarations

use std::fmt;

/// A `<!DOCTYPE>` declaration: name plus optional public and system ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentType {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
}

impl DocumentType {
    pub fn new(name: impl Into<String>, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        DocumentType {
            name: name.into(),
            public_id: public_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
        }
    }

    /// The placeholder declared on documents that hold stored fragments
    pub fn placeholder() -> Self {
        DocumentType::new("temp", None, Some(""))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<!DOCTYPE {}", self.name)?;
        if let Some(public_id) = &self.public_id {
            write!(f, " PUBLIC \"{}\"", public_id)?;
        }
        if let Some(system_id) = &self.system_id {
            if self.public_id.is_none() {
                f.write_str(" SYSTEM")?;
            }
            write!(f, " \"{}\"", system_id)?;
        }
        f.write_str(" >")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let dt = DocumentType::new("html", Some("-//W3C//DTD XHTML 1.0//EN"), Some("xhtml1.dtd"));
        assert_eq!(
            dt.to_string(),
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0//EN\" \"xhtml1.dtd\" >"
        );
        assert_eq!(DocumentType::placeholder().to_string(), "<!DOCTYPE temp SYSTEM \"\" >");
    }
}
