// Product chat. A query puts the robot into Thinking, the reply lands after the typing
// delay (Responding), and the robot drops back to Idle after a grace period.
// Every delay is a deadline checked in `tick`.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::RobotError;
use crate::types::*;

/// Used when a response pool is configured empty.
const FALLBACK_LINE: &str = "Hello!";
/// Query words shorter than this are ignored.
const MIN_WORD_LEN: usize = 3;

const NAME_SCORE: u32 = 3;
const TAG_SCORE: u32 = 2;
const TEXT_SCORE: u32 = 1;

/// Where product answers come from.
pub trait ProductSource {
    /// Best matches for a lower-cased query, most relevant first, at most `limit`.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, RobotError>;
}

/// In-memory catalog with keyword scoring.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        StaticCatalog { products }
    }

    /// The demo catalog.
    pub fn sample() -> Self {
        let product = |id, name: &str, price, description: &str, category: &str, tags: &[&str]| {
            Product {
                id,
                name: name.to_string(),
                price,
                description: description.to_string(),
                category: category.to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            }
        };
        StaticCatalog::new(vec![
            product(
                1,
                "Wireless Bluetooth Headphones",
                79.99,
                "High-quality wireless headphones with noise cancellation and 30-hour battery life.",
                "electronics",
                &["audio", "wireless", "bluetooth", "headphones", "music"],
            ),
            product(
                2,
                "Smart Fitness Watch",
                199.99,
                "Advanced fitness tracker with heart rate monitoring, GPS, and smartphone integration.",
                "wearables",
                &["fitness", "watch", "smart", "health", "tracking", "gps"],
            ),
            product(
                3,
                "Portable Phone Charger",
                29.99,
                "Compact 10,000mAh power bank with fast charging and multiple USB ports.",
                "accessories",
                &["charger", "portable", "battery", "phone", "power bank", "usb"],
            ),
            product(
                4,
                "Ergonomic Office Chair",
                299.99,
                "Comfortable office chair with lumbar support, adjustable height, and breathable mesh.",
                "furniture",
                &["chair", "office", "ergonomic", "furniture", "comfort", "work"],
            ),
            product(
                5,
                "LED Desk Lamp",
                45.99,
                "Adjustable LED desk lamp with multiple brightness levels and USB charging port.",
                "lighting",
                &["lamp", "led", "desk", "lighting", "adjustable", "usb"],
            ),
            product(
                6,
                "Wireless Gaming Mouse",
                89.99,
                "High-precision gaming mouse with customizable RGB lighting and programmable buttons.",
                "gaming",
                &["mouse", "gaming", "wireless", "rgb", "precision", "programmable"],
            ),
            product(
                7,
                "Stainless Steel Water Bottle",
                24.99,
                "Insulated water bottle that keeps drinks cold for 24 hours or hot for 12 hours.",
                "lifestyle",
                &["water bottle", "insulated", "stainless steel", "drinks", "cold", "hot"],
            ),
            product(
                8,
                "Bluetooth Speaker",
                59.99,
                "Portable Bluetooth speaker with 360-degree sound and waterproof design.",
                "electronics",
                &["speaker", "bluetooth", "portable", "waterproof", "audio", "music"],
            ),
            product(
                9,
                "Laptop Stand",
                39.99,
                "Adjustable aluminum laptop stand for better ergonomics and cooling.",
                "accessories",
                &["laptop", "stand", "aluminum", "ergonomic", "cooling", "adjustable"],
            ),
            product(
                10,
                "Plant-Based Protein Powder",
                34.99,
                "Organic plant-based protein powder with 25g protein per serving and natural flavors.",
                "health",
                &["protein", "plant-based", "organic", "health", "fitness", "nutrition"],
            ),
        ])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

/// Sum over query words of the best-field weights that word hits.
fn score(product: &Product, words: &[&str]) -> u32 {
    let name = product.name.to_lowercase();
    let description = product.description.to_lowercase();
    let category = product.category.to_lowercase();
    let tags: Vec<String> = product.tags.iter().map(|t| t.to_lowercase()).collect();

    words
        .iter()
        .map(|word| {
            let mut points = 0;
            if name.contains(word) {
                points += NAME_SCORE;
            }
            if tags.iter().any(|tag| tag.contains(word)) {
                points += TAG_SCORE;
            }
            if description.contains(word) || category.contains(word) {
                points += TEXT_SCORE;
            }
            points
        })
        .sum()
}

impl ProductSource for StaticCatalog {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, RobotError> {
        let words: Vec<&str> = query
            .split_whitespace()
            .filter(|word| word.chars().count() >= MIN_WORD_LEN)
            .collect();

        let mut scored: Vec<(u32, &Product)> = self
            .products
            .iter()
            .map(|product| (score(product, &words), product))
            .filter(|(points, _)| *points > 0)
            .collect();
        // Stable, so equal scores keep catalog order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, product)| product.clone())
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Speaker {
    User,
    Robot,
    /// Placeholder line shown while a reply is pending.
    Thinking,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    pub timestamp: Timestamp,
}

struct PendingReply {
    query: String,
    reply_at: Timestamp,
}

pub struct ChatSession {
    settings: ChatSettings,
    source: Box<dyn ProductSource>,
    messages: VecDeque<ChatMessage>,
    pending: Option<PendingReply>,
    idle_at: Option<Timestamp>,
    rng: SmallRng,
}

impl ChatSession {
    /// New session, opened with a greeting.
    pub fn new(
        settings: ChatSettings,
        source: Box<dyn ProductSource>,
        seed: u64,
        now: Timestamp,
    ) -> Self {
        let mut session = ChatSession {
            settings,
            source,
            messages: VecDeque::new(),
            pending: None,
            idle_at: None,
            rng: SmallRng::seed_from_u64(seed),
        };
        let greeting = pick(&mut session.rng, &session.settings.responses.greeting);
        session.push(Speaker::Robot, greeting, Vec::new(), now);
        session
    }

    pub fn set_source(&mut self, source: Box<dyn ProductSource>) {
        self.source = source;
    }

    /// A query is waiting for its reply.
    pub fn is_processing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Submit a query. Returns the state the robot should enter, or `None` if refused.
    pub fn send(&mut self, text: &str, now: Timestamp) -> Option<RobotState> {
        let query = text.trim();
        if query.is_empty() || self.is_processing() {
            return None;
        }

        self.messages.clear();
        self.idle_at = None;
        self.push(Speaker::User, query.to_string(), Vec::new(), now);
        let thinking = pick(&mut self.rng, &self.settings.responses.thinking);
        self.push(Speaker::Thinking, thinking, Vec::new(), now);

        self.pending = Some(PendingReply {
            query: query.to_lowercase(),
            reply_at: now.plus_millis(self.settings.typing_delay_ms),
        });
        Some(RobotState::Thinking)
    }

    /// Fire due deadlines. Returns the state requests they produce, in order.
    pub fn tick(&mut self, now: Timestamp) -> Vec<RobotState> {
        let mut requests = Vec::new();

        if self.pending.as_ref().is_some_and(|p| now >= p.reply_at) {
            if let Some(pending) = self.pending.take() {
                if self.reply(&pending.query, now) {
                    requests.push(RobotState::Responding);
                }
                self.idle_at = Some(now.plus_millis(self.settings.idle_delay_ms));
            }
        }

        if self.idle_at.is_some_and(|at| now >= at) {
            self.idle_at = None;
            requests.push(RobotState::Idle);
        }
        requests
    }

    /// Swap the thinking line for the answer. Returns false when the source failed.
    fn reply(&mut self, query: &str, now: Timestamp) -> bool {
        self.messages.retain(|m| m.speaker != Speaker::Thinking);

        match self.source.search(query, self.settings.max_product_results) {
            Ok(products) if products.is_empty() => {
                let line = pick(&mut self.rng, &self.settings.responses.no_results);
                self.push(Speaker::Robot, line, Vec::new(), now);
                true
            }
            Ok(products) => {
                let n = products.len();
                log::info!("chat found {} product(s) for '{}'", n, query);
                let line = format!(
                    "I found {} product{} that might interest you:",
                    n,
                    if n > 1 { "s" } else { "" }
                );
                self.push(Speaker::Robot, line, products, now);
                true
            }
            Err(e) => {
                log::warn!("product search failed: {}", e);
                let line = pick(&mut self.rng, &self.settings.responses.error);
                self.push(Speaker::Robot, line, Vec::new(), now);
                false
            }
        }
    }

    fn push(&mut self, speaker: Speaker, text: String, products: Vec<Product>, now: Timestamp) {
        self.messages.push_back(ChatMessage {
            speaker,
            text,
            products,
            timestamp: now,
        });
        while self.messages.len() > self.settings.max_messages {
            self.messages.pop_front();
        }
    }
}

fn pick(rng: &mut SmallRng, pool: &[String]) -> String {
    if pool.is_empty() {
        return FALLBACK_LINE.to_string();
    }
    pool[rng.random_range(0..pool.len())].clone()
}
