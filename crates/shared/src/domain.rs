use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(RoundId);
id_newtype!(StopId);
id_newtype!(MemberId);
id_newtype!(SubscriptionId);
id_newtype!(DeliveryId);
id_newtype!(ProductId);
id_newtype!(VegetableId);

/// Map center used when a stop row carries no coordinates (Épinal).
pub const DEFAULT_LATITUDE: f64 = 48.1724;
pub const DEFAULT_LONGITUDE: f64 = 6.4491;

/// Where a dataset shown to the driver came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Fallback,
}

impl DataSource {
    pub fn is_fallback(self) -> bool {
        self == DataSource::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub round_id: Option<RoundId>,
    pub location: String,
    pub address: String,
    pub quantity: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub position: i32,
    pub validated_at: Option<DateTime<Utc>>,
}

impl Stop {
    /// Number of basket scans needed to complete this stop. Never zero.
    pub fn expected_baskets(&self) -> u32 {
        self.quantity.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundListing {
    pub rounds: Vec<Round>,
    pub source: DataSource,
}

impl RoundListing {
    pub fn live(rounds: Vec<Round>) -> Self {
        Self {
            rounds,
            source: DataSource::Live,
        }
    }

    /// Canned round list shown when the round catalog cannot be fetched.
    pub fn fallback() -> Self {
        Self {
            rounds: vec![Round {
                id: RoundId(1),
                name: "Tournée Épinal".into(),
                color: "#059669".into(),
            }],
            source: DataSource::Fallback,
        }
    }

    pub fn find(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.iter().find(|round| round.id == round_id)
    }
}

impl Default for RoundListing {
    fn default() -> Self {
        Self::live(Vec::new())
    }
}

/// Ordered stop sequence of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub stops: Vec<Stop>,
    pub source: DataSource,
}

impl Itinerary {
    pub fn live(mut stops: Vec<Stop>) -> Self {
        stops.sort_by_key(|stop| stop.position);
        Self {
            stops,
            source: DataSource::Live,
        }
    }

    /// Canned single-stop itinerary substituted when the stop list cannot be fetched.
    pub fn fallback(round_id: RoundId) -> Self {
        Self {
            stops: vec![Stop {
                id: StopId(1),
                round_id: Some(round_id),
                location: "Mairie de Charmes".into(),
                address: "Place de la Mairie".into(),
                quantity: 5,
                latitude: 48.3712,
                longitude: 6.2917,
                position: 1,
                validated_at: None,
            }],
            source: DataSource::Fallback,
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }
}

/// Truck loading summary computed once when a round is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub stop_count: usize,
    pub total_baskets: u32,
    pub largest_drop: u32,
}

impl InventorySummary {
    pub fn from_itinerary(itinerary: &Itinerary) -> Self {
        itinerary
            .stops
            .iter()
            .fold(Self::default(), |mut summary, stop| {
                let baskets = stop.expected_baskets();
                summary.stop_count += 1;
                summary.total_baskets += baskets;
                summary.largest_drop = summary.largest_drop.max(baskets);
                summary
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Member {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub member_id: MemberId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub subscription_id: SubscriptionId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub delivery: Delivery,
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestBasket {
    pub delivery: Delivery,
    pub product_name: String,
    pub composition: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_deliveries: usize,
    pub last_product_name: Option<String>,
    pub last_delivery_date: Option<DateTime<Utc>>,
}

impl DashboardStats {
    pub fn from_history(history: &[DeliveryRecord]) -> Self {
        let last = history
            .iter()
            .max_by_key(|record| record.delivery.created_at);
        Self {
            total_deliveries: history.len(),
            last_product_name: last.map(|record| record.product_name.clone()),
            last_delivery_date: last.map(|record| record.delivery.created_at),
        }
    }
}
