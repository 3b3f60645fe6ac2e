//! CIDR list normalisation

use crate::error::ProviderError;

/// Trims entries and drops blanks, keeping the input order.
/// Fails with [`ProviderError::Empty`] when nothing remains.
pub fn sanitize<I, S>(cidrs: I) -> Result<Vec<String>, ProviderError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cleaned: Vec<String> = cidrs
        .into_iter()
        .map(|cidr| cidr.as_ref().trim().to_string())
        .filter(|cidr| !cidr.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(cleaned)
}

/// Splits a free-form payload on newlines, commas and semicolons
pub fn split_cidrs(payload: &str) -> Vec<String> {
    payload
        .split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
