use common::error::AppError;

/// Extracts the text layer of a PDF. Parsing runs on the blocking pool; the
/// caller only suspends.
pub async fn extract_pdf_text(pdf_bytes: Vec<u8>) -> Result<String, AppError> {
    let extraction = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf_bytes).map(|s| s.trim().to_string())
    })
    .await?
    .map_err(|err| AppError::Extraction(format!("Failed to extract text from PDF: {err}")))?;

    if extraction.is_empty() {
        return Err(AppError::Extraction(
            "PDF contains no extractable text".into(),
        ));
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_fail_with_extraction_error() {
        let result = extract_pdf_text(b"definitely not a pdf".to_vec()).await;

        assert!(matches!(result, Err(AppError::Extraction(_))));
    }
}
