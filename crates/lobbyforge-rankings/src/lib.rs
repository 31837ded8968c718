//! Leaderboard tier for Lobbyforge: [`RankingService`] answers ranking
//! requests from a `(subject, page)` cache and refreshes it on a jittered
//! interval, pushing fresh pages to everyone online.

mod service;

pub use service::RankingService;
