use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::ports::{GeocodingClient, RedirectClient};

use super::{
    consent::{is_consent_wrapper, ConsentUnwrap},
    decimal::DirectDecimal,
    dms::DmsStrategy,
    expander::{Expansion, RedirectExpander},
    input::ResolutionInput,
    place::PlaceLookup,
    url_rules::{
        AtRule, DirectiveRule, FallbackScanRule, LlParamRule, PlacePathRule, QParamRule,
        SearchPathRule, SegmentScanRule,
    },
    NoMatch, ResolutionResult, ResolverSettings, StepResult, StrategyKind, TriedStrategy,
};

/// Which inputs a strategy is attempted on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Only URL-shaped messages; runs against the expanded URL.
    Url,
    Any,
}

/// One extraction algorithm in the resolution chain.
///
/// `attempt` must not panic on any input; every failure is a [`NoMatch`].
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Identity used for ordering diagnostics and the `tried` list.
    fn kind(&self) -> StrategyKind;

    fn scope(&self) -> Scope;

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult;
}

/// Per-call state shared by the strategies of one resolution.
#[derive(Clone, Debug)]
pub struct ResolutionContext {
    input: ResolutionInput,
    target: Option<String>,
    consent_wrapped: bool,
    expansion: Option<Expansion>,
}

impl ResolutionContext {
    pub fn new(input: ResolutionInput) -> Self {
        let target = input.url().map(str::to_string);
        let consent_wrapped = target.as_deref().map(is_consent_wrapper).unwrap_or(false);
        Self {
            input,
            target,
            consent_wrapped,
            expansion: None,
        }
    }

    /// Context for a bare URL, without redirect expansion.
    pub fn for_url(url: &str) -> Self {
        Self::new(ResolutionInput::new(url))
    }

    pub fn input(&self) -> &ResolutionInput {
        &self.input
    }

    /// The URL the URL-scoped rules run against: expanded when expansion
    /// succeeded, otherwise the one found in the message.
    pub fn url(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_consent_wrapped(&self) -> bool {
        self.consent_wrapped
    }

    pub fn expansion(&self) -> Option<&Expansion> {
        self.expansion.as_ref()
    }

    fn apply_expansion(&mut self, expansion: Expansion) {
        self.target = Some(expansion.url().to_string());
        self.consent_wrapped = is_consent_wrapper(expansion.url());
        self.expansion = Some(expansion);
    }
}

/// Single entry point: text in, [`ResolutionResult`] out.
///
/// Stateless between calls; share it behind an `Arc`.
pub struct Resolver {
    strategies: Vec<Box<dyn Strategy>>,
    expander: Option<RedirectExpander>,
}

impl Resolver {
    /// Default chain. Without a redirect client short links are matched as
    /// written; without a geocoder the place lookup reports `Unavailable`.
    pub fn new(
        redirect: Option<Arc<dyn RedirectClient>>,
        geocoder: Option<Arc<dyn GeocodingClient>>,
        settings: ResolverSettings,
    ) -> Self {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(DirectDecimal),
            Box::new(ConsentUnwrap),
            Box::new(AtRule),
            Box::new(DirectiveRule),
            Box::new(LlParamRule),
            Box::new(QParamRule),
            Box::new(PlacePathRule),
            Box::new(SearchPathRule),
            Box::new(FallbackScanRule),
            Box::new(SegmentScanRule),
            Box::new(PlaceLookup::new(geocoder, settings.geocode_timeout)),
            Box::new(DmsStrategy),
        ];
        let expander = redirect.map(|c| RedirectExpander::new(c, settings.redirect_timeout));
        Self::with_strategies(strategies, expander)
    }

    /// Pattern matching only; no network collaborators.
    pub fn offline() -> Self {
        Self::new(None, None, ResolverSettings::default())
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn Strategy>>,
        expander: Option<RedirectExpander>,
    ) -> Self {
        Self {
            strategies,
            expander,
        }
    }

    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub async fn resolve(&self, text: &str) -> ResolutionResult {
        let mut ctx = ResolutionContext::new(ResolutionInput::new(text));
        let url_shaped = ctx.input().looks_like_url();
        let mut tried = Vec::new();

        for strategy in &self.strategies {
            if strategy.scope() == Scope::Url {
                if !url_shaped {
                    continue;
                }
                if ctx.expansion.is_none() {
                    self.expand_into(&mut ctx).await;
                }
            }

            match strategy.attempt(&ctx).await {
                Ok(found) => {
                    info!("resolved via {} -> {}", found.source, found.coordinate);
                    return ResolutionResult::Found {
                        coordinate: found.coordinate,
                        source: found.source,
                    };
                }
                Err(reason) => {
                    debug!("{} no match: {reason}", strategy.kind());
                    tried.push(TriedStrategy {
                        strategy: strategy.kind(),
                        reason,
                    });
                }
            }
        }

        debug!("no coordinate after {} strategies", tried.len());
        ResolutionResult::NotFound { tried }
    }

    async fn expand_into(&self, ctx: &mut ResolutionContext) {
        let Some(url) = ctx.url().map(str::to_string) else {
            return;
        };
        let expansion = if !ctx.input().is_short_link() {
            Expansion::Unchanged {
                url,
                reason: NoMatch::Skipped,
            }
        } else if let Some(expander) = &self.expander {
            expander.expand(&url).await
        } else {
            debug!("short link left unexpanded: no redirect client");
            Expansion::Unchanged {
                url,
                reason: NoMatch::Unavailable,
            }
        };
        ctx.apply_expansion(expansion);
    }
}
