use vai_core::{config::ProxyConfig, errors::Error};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fail before binding anything when the session cookie is missing.
    let cfg = match ProxyConfig::load() {
        Ok(cfg) => cfg,
        Err(Error::Config(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    vai_core::logging::init("vai-proxy")?;
    vai_proxy::run(cfg).await
}
