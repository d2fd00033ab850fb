use crate::core::{
    errors::{AppError, AppResult},
    types::Provider,
};

const SERVICE: &str = "petition-validator";

fn username_for_provider(provider: &Provider) -> &'static str {
    match provider {
        Provider::Gemini => "gemini",
    }
}

fn entry_for(provider: &Provider) -> AppResult<keyring::Entry> {
    keyring::Entry::new(SERVICE, username_for_provider(provider))
        .map_err(|err| AppError::Internal(err.to_string()))
}

pub fn set_provider_key(provider: Provider, api_key: &str) -> AppResult<()> {
    entry_for(&provider)?
        .set_password(api_key)
        .map_err(|err| AppError::Internal(err.to_string()))
}

/// A missing or unreadable key surfaces as [`AppError::ProviderAuth`].
pub fn get_provider_key(provider: Provider) -> AppResult<String> {
    entry_for(&provider)?
        .get_password()
        .map_err(|_err| AppError::ProviderAuth)
}

pub fn delete_provider_key(provider: Provider) -> AppResult<bool> {
    match entry_for(&provider)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(AppError::Internal(err.to_string())),
    }
}
