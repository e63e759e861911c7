use std::sync::OnceLock;

static CLIENT: OnceLock<wreq::Client> = OnceLock::new();

/// Process-wide HTTP client; connection pooling across attempts and
/// providers.
pub(crate) fn shared_client() -> &'static wreq::Client {
    CLIENT.get_or_init(wreq::Client::new)
}
