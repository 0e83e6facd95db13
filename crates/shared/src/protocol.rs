//! PostgREST row shapes, named after the cooperative's tables and columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{
    Delivery, DeliveryId, Member, MemberId, Product, ProductId, Round, RoundId, Stop, StopId,
    Subscription, SubscriptionId, VegetableId, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
};

pub const DEFAULT_ROUND_COLOR: &str = "#059669";

/// `tournee` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourneeRow {
    pub id: i64,
    pub tournee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub couleur: Option<String>,
}

impl From<TourneeRow> for Round {
    fn from(row: TourneeRow) -> Self {
        Self {
            id: RoundId(row.id),
            name: row.tournee,
            color: row
                .couleur
                .unwrap_or_else(|| DEFAULT_ROUND_COLOR.to_string()),
        }
    }
}

/// `distribution` row: one stop of a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRow {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournee_id: Option<i64>,
    pub lieu: String,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub qte: Option<u32>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub ordre: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
}

impl From<DistributionRow> for Stop {
    fn from(row: DistributionRow) -> Self {
        Self {
            id: StopId(row.id),
            round_id: row.tournee_id.map(RoundId),
            location: row.lieu,
            address: row.adresse.unwrap_or_default(),
            quantity: row.qte.unwrap_or(1),
            latitude: row.lat.unwrap_or(DEFAULT_LATITUDE),
            longitude: row.lng.unwrap_or(DEFAULT_LONGITUDE),
            position: row.ordre.unwrap_or_default(),
            validated_at: row.validated_at,
        }
    }
}

/// Body of the `PATCH /distribution?id=eq.<id>` write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedAtPatch {
    pub validated_at: DateTime<Utc>,
}

/// `adherent` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdherentRow {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub nom: Option<String>,
}

impl From<AdherentRow> for Member {
    fn from(row: AdherentRow) -> Self {
        Self {
            id: MemberId(row.id),
            email: row.email,
            first_name: row.prenom,
            last_name: row.nom,
        }
    }
}

/// `abonnement` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbonnementRow {
    pub id: i64,
    pub adherent_id: i64,
}

impl From<AbonnementRow> for Subscription {
    fn from(row: AbonnementRow) -> Self {
        Self {
            id: SubscriptionId(row.id),
            member_id: MemberId(row.adherent_id),
        }
    }
}

/// `livraison` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivraisonRow {
    pub id: i64,
    pub abonnement_id: i64,
    pub produit_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LivraisonRow> for Delivery {
    fn from(row: LivraisonRow) -> Self {
        Self {
            id: DeliveryId(row.id),
            subscription_id: SubscriptionId(row.abonnement_id),
            product_id: ProductId(row.produit_id),
            created_at: row.created_at,
        }
    }
}

/// `produit` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProduitRow {
    pub id: i64,
    pub produit: String,
}

impl From<ProduitRow> for Product {
    fn from(row: ProduitRow) -> Self {
        Self {
            id: ProductId(row.id),
            name: row.produit,
        }
    }
}

/// `composition_produit_legume` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionRow {
    pub produit_id: i64,
    pub legume_id: i64,
}

impl CompositionRow {
    pub fn vegetable_id(&self) -> VegetableId {
        VegetableId(self.legume_id)
    }
}

/// `legume` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegumeRow {
    pub id: i64,
    pub nom: String,
}

/// Quantities come back as numbers or numeric strings depending on the view.
fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Float(f64),
        Text(String),
    }

    let parsed = match Option::<Raw>::deserialize(deserializer)? {
        None => None,
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Float(f)) => Some(f.trunc() as i64),
        Some(Raw::Text(text)) => {
            let digits: String = text
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            digits.parse::<i64>().ok()
        }
    };
    Ok(parsed.map(|n| n.clamp(0, u32::MAX as i64) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_row_accepts_string_quantity() {
        let row: DistributionRow = serde_json::from_str(
            r#"{"id":4,"tournee_id":2,"lieu":"Prairie Claudel","adresse":"Rue Claudel","qte":"3","lat":48.25,"lng":6.4167,"ordre":2}"#,
        )
        .expect("row");
        let stop = Stop::from(row);
        assert_eq!(stop.quantity, 3);
        assert_eq!(stop.round_id, Some(RoundId(2)));
        assert_eq!(stop.position, 2);
        assert!(stop.validated_at.is_none());
    }

    #[test]
    fn distribution_row_defaults_missing_fields() {
        let row: DistributionRow =
            serde_json::from_str(r#"{"id":5,"lieu":"Gare","qte":null}"#).expect("row");
        let stop = Stop::from(row);
        assert_eq!(stop.quantity, 1);
        assert_eq!(stop.latitude, DEFAULT_LATITUDE);
        assert_eq!(stop.longitude, DEFAULT_LONGITUDE);
        assert_eq!(stop.address, "");
    }

    #[test]
    fn negative_or_garbage_quantity_is_clamped() {
        let neg: DistributionRow =
            serde_json::from_str(r#"{"id":1,"lieu":"a","qte":-2}"#).expect("row");
        assert_eq!(neg.qte, Some(0));
        let garbage: DistributionRow =
            serde_json::from_str(r#"{"id":1,"lieu":"a","qte":"many"}"#).expect("row");
        assert_eq!(garbage.qte, None);
    }

    #[test]
    fn round_without_color_gets_default() {
        let row: TourneeRow =
            serde_json::from_str(r#"{"id":1,"tournee":"Tournée Épinal"}"#).expect("row");
        let round = Round::from(row);
        assert_eq!(round.color, DEFAULT_ROUND_COLOR);
        assert_eq!(round.name, "Tournée Épinal");
    }
}
