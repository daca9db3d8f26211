//! Phrase matching for detected text.
//!
//! A detection matches when its folded text appears as a contiguous substring
//! of the folded phrase. The direction is deliberate: OCR isolates short
//! fragments, so the user may type a whole sentence containing them. Matching
//! is not tokenized, so "cat" matches inside "concatenate".

use censor_ocr::TextDetection;

/// Full Unicode default case folding, independent of locale.
///
/// Unlike lowercasing this expands characters such as `ß` to `ss`.
pub fn fold(text: &str) -> String {
    caseless::default_case_fold_str(text)
}

/// Whether `detection` should be redacted for `phrase`
pub fn matches(detection: &TextDetection, phrase: &str) -> bool {
    // An empty needle is a substring of everything
    if detection.text.trim().is_empty() || phrase.trim().is_empty() {
        return false;
    }

    fold(phrase).contains(&fold(&detection.text))
}
