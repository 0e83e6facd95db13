//! Subscriber-side queries: sign-in by e-mail, delivery history, dashboard.

use futures::future::{join_all, try_join_all};
use shared::{
    domain::{
        DashboardStats, Delivery, DeliveryRecord, LatestBasket, Member, MemberId, Product,
        ProductId, Subscription,
    },
    protocol::{AbonnementRow, AdherentRow, CompositionRow, LegumeRow, LivraisonRow, ProduitRow},
};
use tracing::{info, warn};

use crate::{ClientError, PostgrestClient, Query};

pub const UNKNOWN_VEGETABLE: &str = "Unknown";

impl PostgrestClient {
    /// Finds the member registered with `email`.
    pub async fn login(&self, email: &str) -> Result<Member, ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ClientError::InvalidInput("an e-mail address is required".into()));
        }
        let row: Option<AdherentRow> = self
            .select_first("adherent", &Query::new().eq("email", email))
            .await?;
        match row {
            Some(row) => Ok(row.into()),
            None => Err(ClientError::NotFound {
                what: format!("member with e-mail {email}"),
            }),
        }
    }

    pub async fn subscription(
        &self,
        member_id: MemberId,
    ) -> Result<Option<Subscription>, ClientError> {
        let row: Option<AbonnementRow> = self
            .select_first("abonnement", &Query::new().eq("adherent_id", member_id))
            .await?;
        Ok(row.map(Subscription::from))
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product, ClientError> {
        let row: Option<ProduitRow> = self
            .select_first("produit", &Query::new().eq("id", product_id))
            .await?;
        row.map(Product::from).ok_or_else(|| ClientError::NotFound {
            what: format!("product {product_id}"),
        })
    }

    /// Deliveries of the member's subscription, newest first, each with its
    /// product name. A member without subscription has an empty history.
    pub async fn delivery_history(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<DeliveryRecord>, ClientError> {
        let Some(subscription) = self.subscription(member_id).await? else {
            info!(member_id = member_id.0, "no subscription for member");
            return Ok(Vec::new());
        };

        let query = Query::new()
            .eq("abonnement_id", subscription.id)
            .order_desc("created_at");
        let rows: Vec<LivraisonRow> = self.select("livraison", &query).await?;
        let deliveries: Vec<Delivery> = rows.into_iter().map(Delivery::from).collect();

        try_join_all(deliveries.into_iter().map(|delivery| async move {
            let product = self.product(delivery.product_id).await?;
            Ok::<_, ClientError>(DeliveryRecord {
                delivery,
                product_name: product.name,
            })
        }))
        .await
    }

    /// Most recent delivery together with the vegetables it contained.
    pub async fn latest_basket(
        &self,
        member_id: MemberId,
    ) -> Result<Option<LatestBasket>, ClientError> {
        let history = self.delivery_history(member_id).await?;
        let Some(latest) = history
            .into_iter()
            .max_by_key(|record| record.delivery.created_at)
        else {
            return Ok(None);
        };

        let query = Query::new().eq("produit_id", latest.delivery.product_id);
        let relations: Vec<CompositionRow> =
            self.select("composition_produit_legume", &query).await?;
        let composition = join_all(relations.iter().map(|relation| async move {
            let query = Query::new().eq("id", relation.vegetable_id());
            match self.select_first::<LegumeRow>("legume", &query).await {
                Ok(Some(row)) => row.nom,
                Ok(None) => UNKNOWN_VEGETABLE.to_string(),
                Err(err) => {
                    warn!(legume_id = relation.legume_id, error = %err, "vegetable lookup failed");
                    UNKNOWN_VEGETABLE.to_string()
                }
            }
        }))
        .await;

        Ok(Some(LatestBasket {
            delivery: latest.delivery,
            product_name: latest.product_name,
            composition,
        }))
    }

    pub async fn dashboard_stats(&self, member_id: MemberId) -> Result<DashboardStats, ClientError> {
        let history = self.delivery_history(member_id).await?;
        Ok(DashboardStats::from_history(&history))
    }
}

#[cfg(test)]
#[path = "tests/subscriber_tests.rs"]
mod tests;
