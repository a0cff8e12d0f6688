use std::sync::Arc;

use m2w_core::{
    config::Config,
    formatting::waze_link,
    location::format_dms,
    ports::{GeocodingClient, RedirectClient},
    Error, ResolutionResult, Resolver,
};
use m2w_http::{GooglePlacesClient, ReqwestRedirectClient};

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    Bot,
    /// `m2w resolve [--json] <text...>`: one-shot resolution for debugging.
    Resolve { text: String, json: bool },
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Mode {
    let mut args = args.into_iter().peekable();
    if args.peek().map(String::as_str) != Some("resolve") {
        return Mode::Bot;
    }
    args.next();

    let mut json = false;
    let mut words = Vec::new();
    for arg in args {
        if arg == "--json" && words.is_empty() {
            json = true;
        } else {
            words.push(arg);
        }
    }
    Mode::Resolve {
        text: words.join(" "),
        json,
    }
}

fn build_resolver(cfg: &Config) -> m2w_core::Result<Resolver> {
    let redirect: Arc<dyn RedirectClient> = Arc::new(ReqwestRedirectClient::new(
        cfg.redirect_timeout,
        &cfg.http_user_agent,
    )?);

    let geocoder: Option<Arc<dyn GeocodingClient>> = match &cfg.google_maps_api_key {
        Some(key) => Some(Arc::new(GooglePlacesClient::new(
            cfg.places_api_base_url.clone(),
            key.clone(),
            cfg.geocode_timeout,
        )?)),
        None => None,
    };

    Ok(Resolver::new(
        Some(redirect),
        geocoder,
        cfg.resolver_settings(),
    ))
}

fn render(result: &ResolutionResult, json: bool) -> Result<String, Error> {
    if json {
        return serde_json::to_string_pretty(result)
            .map_err(|e| Error::External(format!("json encode failed: {e}")));
    }
    Ok(match result {
        ResolutionResult::Found { coordinate, source } => {
            let mut out = format!(
                "strategy:   {source}\ncoordinate: {coordinate}\ndms:        {}\nwaze:       {}",
                format_dms(coordinate),
                waze_link(coordinate)
            );
            if source.is_low_confidence() {
                out.push_str("\nnote:       low confidence match");
            }
            out
        }
        ResolutionResult::NotFound { tried } => {
            let mut out = String::from("not found; tried:");
            for t in tried {
                out.push_str(&format!("\n  {:<20} {}", t.strategy.as_str(), t.reason));
            }
            out
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    m2w_core::logging::init("m2w")?;

    let cfg = Arc::new(Config::load()?);
    let resolver = Arc::new(build_resolver(&cfg)?);

    match parse_args(std::env::args().skip(1)) {
        Mode::Resolve { text, json } => {
            let result = resolver.resolve(&text).await;
            println!("{}", render(&result, json)?);
            if !result.is_found() {
                std::process::exit(1);
            }
        }
        Mode::Bot => {
            m2w_telegram::router::run_polling(cfg, resolver)
                .await
                .map_err(|e| Error::External(format!("telegram bot failed: {e}")))?;
        }
    }

    Ok(())
}
