//! Fabricated live telemetry
//!
//! A background task publishes one event of each kind on a random interval
//! into a `tokio::sync::broadcast` bus; `/api/v1/telemetry/stream` relays the
//! bus to clients as Server-Sent Events. Slow subscribers lose events.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::configuration::MockFeedSettings;
use crate::domain::campaign::Platform;

const BUS_CAPACITY: usize = 256;

const AUTHORS: &[&str] = &[
    "@urban.lens",
    "@fitwithmaya",
    "@techtalks_daily",
    "@chef.rafael",
    "@wanderlust.ana",
];

const POST_CONTENT: &[&str] = &[
    "Just tried the new summer collection and I'm obsessed!",
    "Not sure how I feel about this launch, the price seems high.",
    "Behind the scenes of today's shoot",
    "Customer service was quick and helpful, 10/10",
    "Anyone else seeing these ads everywhere?",
];

const CAMPAIGN_NAMES: &[&str] = &[
    "Summer Launch",
    "Back to School",
    "Holiday Giveaway",
    "Brand Awareness Q3",
    "Retargeting - Cart Abandoners",
];

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SentimentUpdate {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
    pub sample_size: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NewPostEvent {
    pub platform: Platform,
    pub author: String,
    pub content: String,
    pub engagement: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CampaignUpdate {
    pub campaign_name: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub spend: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FeedEvent {
    SentimentUpdate(SentimentUpdate),
    NewPost(NewPostEvent),
    CampaignUpdate(CampaignUpdate),
}

impl FeedEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FeedEvent::SentimentUpdate(_) => "sentiment_update",
            FeedEvent::NewPost(_) => "new_post",
            FeedEvent::CampaignUpdate(_) => "campaign_update",
        }
    }

    fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            FeedEvent::SentimentUpdate(e) => serde_json::to_string(e),
            FeedEvent::NewPost(e) => serde_json::to_string(e),
            FeedEvent::CampaignUpdate(e) => serde_json::to_string(e),
        }
    }

    /// Renders the event as one SSE frame.
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("event: {}\ndata: {}\n\n", self.name(), self.data()?))
    }
}

/// Shared handle to the telemetry broadcast bus.
#[derive(Clone, Debug)]
pub struct FeedBus {
    sender: broadcast::Sender<FeedEvent>,
}

impl Default for FeedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: FeedEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

pub fn random_sentiment<R: Rng>(rng: &mut R) -> SentimentUpdate {
    let positive = rng.gen_range(30..=70);
    let negative = rng.gen_range(5..=(100 - positive).min(30));
    SentimentUpdate {
        positive,
        neutral: 100 - positive - negative,
        negative,
        sample_size: rng.gen_range(100..=5000),
    }
}

pub fn random_post<R: Rng>(rng: &mut R) -> NewPostEvent {
    NewPostEvent {
        platform: *Platform::ALL.choose(rng).unwrap_or(&Platform::Instagram),
        author: AUTHORS.choose(rng).copied().unwrap_or("@anonymous").to_string(),
        content: POST_CONTENT.choose(rng).copied().unwrap_or_default().to_string(),
        engagement: rng.gen_range(0..=10_000),
    }
}

pub fn random_campaign_update<R: Rng>(rng: &mut R) -> CampaignUpdate {
    let impressions: u64 = rng.gen_range(1_000..=100_000);
    let clicks = rng.gen_range(0..=impressions / 10);
    let ctr = (clicks as f64 / impressions as f64 * 100.0 * 100.0).round() / 100.0;
    let spend = (rng.gen_range(10.0..500.0_f64) * 100.0).round() / 100.0;

    CampaignUpdate {
        campaign_name: CAMPAIGN_NAMES
            .choose(rng)
            .copied()
            .unwrap_or("Untitled")
            .to_string(),
        impressions,
        clicks,
        ctr,
        spend,
    }
}

fn next_interval<R: Rng>(rng: &mut R, settings: &MockFeedSettings) -> Duration {
    let min = settings.min_interval_seconds.max(1);
    let max = settings.max_interval_seconds.max(min);
    Duration::from_secs(rng.gen_range(min..=max))
}

/// Starts the emitter. Returns `None` when the feed is disabled.
pub fn spawn_mock_feed(bus: FeedBus, settings: MockFeedSettings) -> Option<JoinHandle<()>> {
    if !settings.enabled {
        tracing::info!("Mock telemetry feed disabled");
        return None;
    }

    tracing::info!(
        min_interval_seconds = settings.min_interval_seconds,
        max_interval_seconds = settings.max_interval_seconds,
        "Starting mock telemetry feed"
    );

    Some(tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        loop {
            tokio::time::sleep(next_interval(&mut rng, &settings)).await;

            let events = [
                FeedEvent::SentimentUpdate(random_sentiment(&mut rng)),
                FeedEvent::NewPost(random_post(&mut rng)),
                FeedEvent::CampaignUpdate(random_campaign_update(&mut rng)),
            ];
            let mut delivered = 0;
            for event in events {
                delivered = bus.publish(event);
            }
            tracing::debug!(subscribers = delivered, "Published mock telemetry");
        }
    }))
}
