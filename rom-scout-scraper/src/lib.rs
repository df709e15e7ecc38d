//! The scrape pipeline: metadata API abstraction, disk response cache,
//! rate limiter, filter language and the concurrent orchestrator.

pub mod api;
pub mod cache;
pub mod client;
pub mod context;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod progress;
pub mod rate_limit;
pub mod scrape;
pub mod single_flight;

pub use api::{GameRecord, LookupQuery, MediaPayload, MediaRecord, MetadataAPI, ServerInfo, UserInfo};
pub use cache::{CacheMode, ResponseCache};
pub use client::ScreenScraperClient;
pub use context::FilterContextBuilder;
pub use credentials::Credentials;
pub use error::ScrapeError;
pub use filter::{FilterContext, FilterExpr};
pub use progress::{EntryOutcome, ProgressModel, ProgressSnapshot, ScrapeUpdate};
pub use rate_limit::{RateLimiter, RateLimiterStats};
pub use scrape::{ScrapeConfig, ScrapePlan, ScrapeResults, ScrapedEntry, Scraper, plan_scrape};
