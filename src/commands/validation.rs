use crate::{
    core::{
        district::TargetDistrict,
        errors::{AppError, AppResult},
        types::{PageOutcome, PageReport, PetitionInfo, ValidatePagesRequest, ValidatePagesResponse},
    },
    AppState,
};

fn normalized_optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validates an ordered batch of page images against one target district.
/// Nothing is persisted; callers commit pages through `save_page`.
pub async fn validate_pages(
    state: &AppState,
    request: ValidatePagesRequest,
) -> AppResult<ValidatePagesResponse> {
    if request.pages.is_empty() {
        return Err(AppError::InvalidInput("no pages submitted".to_string()));
    }
    if request.target_district.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "target district cannot be empty".to_string(),
        ));
    }
    if matches!(request.required_signatures, Some(required) if required < 0) {
        return Err(AppError::InvalidInput(
            "required signatures cannot be negative".to_string(),
        ));
    }

    let district = TargetDistrict::parse(&request.target_district);
    let info = PetitionInfo {
        district: district.to_string(),
        required_signatures: request
            .required_signatures
            .or_else(|| district.default_required_signatures()),
        party: normalized_optional(request.party),
        name: normalized_optional(request.petition_name),
    };

    let batch = state
        .engine
        .process_pages(&request.pages, &district, info)
        .await?;
    let reports = batch
        .pages
        .iter()
        .map(|page| {
            let outcome = PageOutcome::for_result(&page.result);
            PageReport {
                page_number: page.page_number,
                message: outcome.message(),
                outcome,
                warnings: page.warnings.clone(),
            }
        })
        .collect();

    Ok(ValidatePagesResponse { batch, reports })
}
