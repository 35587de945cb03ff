//! Best-effort company logo lookup from the entity's website domain.
//! Never errors: any failure just means no logo.

use std::time::Duration;

use tracing::debug;

const LOGO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LogoFinder {
    http: reqwest::Client,
}

impl Default for LogoFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoFinder {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(LOGO_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Resolve a logo URL for a website. Tries a logo CDN first, falls back
    /// to a favicon service.
    pub async fn find(&self, website: &str) -> Option<String> {
        let domain = extract_domain(website)?;

        let logo_url = format!("https://logo.clearbit.com/{domain}");
        if self.head_ok(&logo_url).await {
            return Some(logo_url);
        }

        debug!(domain, "Logo CDN miss, using favicon fallback");
        Some(format!(
            "https://www.google.com/s2/favicons?domain={domain}&sz=128"
        ))
    }

    async fn head_ok(&self, url: &str) -> bool {
        match self.http.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

fn extract_domain(website: &str) -> Option<String> {
    let with_scheme = if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("https://{website}")
    };

    let parsed = url::Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_domains_and_full_urls_normalize() {
        assert_eq!(
            extract_domain("https://www.fjordlogistikk.no/om-oss").as_deref(),
            Some("fjordlogistikk.no")
        );
        assert_eq!(
            extract_domain("fjordlogistikk.no").as_deref(),
            Some("fjordlogistikk.no")
        );
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("not a url at all"), None);
    }
}
