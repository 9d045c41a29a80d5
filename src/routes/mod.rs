mod admin;
mod ads;
mod analytics;
mod auth;
mod campaigns;
mod health_check;
pub mod instagram;
mod telemetry;
pub mod youtube;

pub use admin::list_users;
pub use ads::{create_ad, delete_ad, get_ad, list_ads, update_ad, update_ad_status};
pub use analytics::{campaign_series, overview, record_analytics};
pub use auth::{
    forgot_password, get_current_user, login, logout, refresh, register, reset_password,
    verify_email, AuthResponse,
};
pub use campaigns::{
    campaign_stats, create_campaign, delete_campaign, get_campaign, list_campaign_ads,
    list_campaigns, update_campaign, update_campaign_status,
};
pub use health_check::health_check;
pub use telemetry::telemetry_stream;

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("summer"), "summer");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
