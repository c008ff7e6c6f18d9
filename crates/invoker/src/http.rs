use crate::trust_store;
use codehealth_config::Config;
use reqwest::{Certificate, Client, NoProxy, Proxy};

pub const USER_AGENT: &str = concat!("codehealth-mcp/", env!("CARGO_PKG_VERSION"));

/// HTTP client honouring the configured proxies and CA bundle.
pub fn build_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(USER_AGENT);

    let no_proxy = config
        .proxy
        .no_proxy
        .as_deref()
        .and_then(NoProxy::from_string);
    if let Some(url) = &config.proxy.http {
        builder = builder.proxy(Proxy::http(url)?.no_proxy(no_proxy.clone()));
    }
    if let Some(url) = &config.proxy.https {
        builder = builder.proxy(Proxy::https(url)?.no_proxy(no_proxy));
    }

    if let Some(bytes) = config
        .ca_bundle
        .as_deref()
        .and_then(trust_store::read_pem_bundle)
    {
        for cert in Certificate::from_pem_bundle(&bytes)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder.build()
}
