//! Sharable links wrapping an action URL: `<base>/<path>?action=<percent-encoded target>`.
use thiserror::Error;
use url::Url;

const ACTION_QUERY_KEY: &str = "action";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShareLinkError {
    #[error("Invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Link `{0}` does not carry an action")]
    MissingAction(String),
}

fn parse(url: &str) -> Result<Url, ShareLinkError> {
    Url::parse(url)
        .map_err(|err| ShareLinkError::InvalidUrl { url: url.to_string(), reason: err.to_string() })
}

/// Wraps `target`, which must be an absolute URL, into a link served under `base`/`path`.
pub fn encode_share_link(base: &str, path: &str, target: &str) -> Result<String, ShareLinkError> {
    parse(target)?;
    let wrapper = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut link = parse(&wrapper)?;
    link.query_pairs_mut()
        .append_pair(ACTION_QUERY_KEY, target);
    Ok(link.into())
}

/// Recovers the target URL exactly as it was passed to [`encode_share_link`].
pub fn decode_share_link(link: &str) -> Result<String, ShareLinkError> {
    let url = parse(link)?;
    url.query_pairs()
        .find(|(key, _)| key == ACTION_QUERY_KEY)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| ShareLinkError::MissingAction(link.to_string()))
}
