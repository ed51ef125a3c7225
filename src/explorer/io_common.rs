use std::path::Path;

/// The kinds of files a dataset can be read from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Excel,
    Csv,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Picks the reader from the extension of the file.
pub fn provider_for(path: &str) -> Option<Provider> {
    let ext = Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") => Some(Provider::Excel),
        Some("csv") => Some(Provider::Csv),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_from_extensions() {
        assert_eq!(provider_for("data/LF_data.xlsx"), Some(Provider::Excel));
        assert_eq!(provider_for("sth.XLSX"), Some(Provider::Excel));
        assert_eq!(provider_for("/tmp/sth_export.csv"), Some(Provider::Csv));
        assert_eq!(provider_for("sth.ods"), None);
        assert_eq!(provider_for("sth"), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/data/in/LF_data.xlsx"), "LF_data.xlsx");
        assert_eq!(simplify_file_name("sth.csv"), "sth.csv");
    }
}
