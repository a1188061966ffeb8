//! Image selector groups
//!
//! A selector is a radio choice between "existing image" (a list filled
//! from the server) and a manual path entry with a browse button.

use std::sync::Arc;

use crate::client::ImageEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectorId(pub(super) usize);

impl SelectorId {
    /// Position among the wizard's selectors (and in `Visibility::selectors`)
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which half of the selector is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSource {
    /// Pick from the images the server reported
    #[default]
    Existing,
    /// Type or browse a path
    Manual,
}

/// What the external file picker should offer for this selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerFilter {
    pub title: &'static str,
    /// File suffixes to show; empty shows every file
    pub extensions: &'static [&'static str],
}

impl PickerFilter {
    pub fn matches(&self, file_name: &str) -> bool {
        self.extensions.is_empty() || self.extensions.iter().any(|ext| file_name.ends_with(ext))
    }
}

#[derive(Debug, Clone)]
pub struct ImageSelector {
    id: SelectorId,
    label: String,
    source: ImageSource,
    entries: Arc<[ImageEntry]>,
    current: Option<usize>,
    text: String,
    picker: PickerFilter,
}

impl ImageSelector {
    pub(super) fn new(id: SelectorId, label: impl Into<String>, picker: PickerFilter) -> Self {
        Self {
            id,
            label: label.into(),
            source: ImageSource::Existing,
            entries: Arc::from(Vec::new()),
            current: None,
            text: String::new(),
            picker,
        }
    }

    pub fn id(&self) -> SelectorId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_entry(&self) -> Option<&ImageEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    /// Contents of the path field
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn picker(&self) -> PickerFilter {
        self.picker
    }

    pub(super) fn set_source(&mut self, source: ImageSource) {
        self.source = source;
    }

    /// Returns true if the text actually changed
    pub(super) fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }

    /// Clear the list and refill it; the first entry becomes current
    pub(super) fn set_entries(&mut self, entries: Arc<[ImageEntry]>) {
        self.current = if entries.is_empty() { None } else { Some(0) };
        self.entries = entries;
    }

    /// Make `index` current; returns the filename to copy into the path field
    pub(super) fn select(&mut self, index: usize) -> Option<String> {
        let filename = self.entries.get(index)?.filename.clone();
        self.current = Some(index);
        Some(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANY: PickerFilter = PickerFilter {
        title: "Image",
        extensions: &[],
    };

    #[test]
    fn test_entries_are_shared() {
        let entries: Arc<[ImageEntry]> =
            Arc::from(vec![ImageEntry::named("a.bin"), ImageEntry::named("b.bin")]);

        let mut first = ImageSelector::new(SelectorId(0), "first", ANY);
        let mut second = ImageSelector::new(SelectorId(1), "second", ANY);
        first.set_entries(entries.clone());
        second.set_entries(entries.clone());

        assert_eq!(Arc::strong_count(&entries), 3);
        assert_eq!(first.current_entry().unwrap().filename, "a.bin");
        assert_eq!(second.entries().len(), 2);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut selector = ImageSelector::new(SelectorId(0), "image", ANY);
        selector.set_entries(Arc::from(vec![ImageEntry::named("a.bin")]));

        assert_eq!(selector.select(3), None);
        assert_eq!(selector.current_index(), Some(0));
        assert_eq!(selector.select(0), Some("a.bin".to_string()));
    }

    #[test]
    fn test_empty_list_has_no_current() {
        let mut selector = ImageSelector::new(SelectorId(0), "image", ANY);
        selector.set_entries(Arc::from(Vec::new()));
        assert!(selector.current_entry().is_none());
    }

    #[test]
    fn test_picker_filter() {
        let filter = PickerFilter {
            title: "IOU image",
            extensions: &[".bin", ".image"],
        };
        assert!(filter.matches("i86bi-linux-l2.bin"));
        assert!(filter.matches("x.image"));
        assert!(!filter.matches("notes.txt"));
        assert!(ANY.matches("notes.txt"));
    }
}
