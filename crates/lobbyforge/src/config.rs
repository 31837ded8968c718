//! Lobby-wide configuration.

use std::time::Duration;

/// Tuning and content knobs for one lobby process.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Protocol version sent in the connect handshake.
    pub version: u32,
    /// The town hub new and recovering players are placed on.
    pub starting_map: String,
    /// Town maps pre-registered at startup.
    pub town_maps: Vec<String>,
    /// Message-of-the-day lines whispered on the announcements channel.
    pub motd: Vec<String>,
    /// Mailbox feedback mail is relayed to.
    pub feedback_address: String,
    pub max_players_per_instance: u32,
    pub ranking_page_size: u32,
    /// Cached ranking pages older than this are re-fetched on read.
    pub ranking_max_age: Duration,
    pub ranking_refresh_period: Duration,
    /// Rows served per staff recent-activity list.
    pub staff_activity_count: usize,
    /// Rows kept in each recent-activity list.
    pub activity_cap: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            version: 1,
            starting_map: "Oaktown".to_owned(),
            town_maps: vec!["Oaktown".to_owned()],
            motd: vec!["Welcome back.".to_owned()],
            feedback_address: "feedback@example.net".to_owned(),
            max_players_per_instance: 16,
            ranking_page_size: 20,
            ranking_max_age: Duration::from_secs(300),
            ranking_refresh_period: Duration::from_secs(600),
            staff_activity_count: 20,
            activity_cap: 50,
        }
    }
}
