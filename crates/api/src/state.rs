//! Shared application state.

use std::sync::Arc;

use domain::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use inventory::{InMemoryStockLedger, PostgresStockLedger, StockLedger};
use merchant::{InMemoryMerchantStore, MerchantService, MerchantStore};
use rider::{
    DeliveryStore, InMemoryDeliveryStore, InMemoryRiderStore, PostgresDeliveryStore,
    RiderService, RiderStore,
};
use saga::{OrderClient, OrderOrchestrator};
use sqlx::PgPool;

pub type Orders = OrderOrchestrator<Arc<dyn StockLedger>, Arc<dyn OrderStore>>;
pub type Merchants = MerchantService<Arc<dyn MerchantStore>, Arc<dyn OrderClient>>;
pub type Riders = RiderService<Arc<dyn RiderStore>, Arc<dyn DeliveryStore>, Arc<dyn OrderClient>>;

/// Services shared by every handler.
///
/// The merchant and rider services reach the order service only through
/// [`OrderClient`], the same seam a networked deployment would use.
pub struct AppState {
    pub orders: Arc<Orders>,
    pub merchants: Merchants,
    pub riders: Riders,
}

impl AppState {
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        order_store: Arc<dyn OrderStore>,
        deliveries: Arc<dyn DeliveryStore>,
    ) -> Self {
        let orders = Arc::new(OrderOrchestrator::new(ledger, order_store));
        let client: Arc<dyn OrderClient> = orders.clone();
        let merchant_store: Arc<dyn MerchantStore> = Arc::new(InMemoryMerchantStore::new());
        let rider_store: Arc<dyn RiderStore> = Arc::new(InMemoryRiderStore::new());
        Self {
            merchants: MerchantService::new(merchant_store, client.clone()),
            riders: RiderService::new(rider_store, deliveries, client),
            orders,
        }
    }

    /// State backed entirely by in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStockLedger::new()),
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(InMemoryDeliveryStore::new()),
        )
    }

    /// State backed by PostgreSQL for stock, orders and delivery
    /// assignments. Runs every migration first.
    pub async fn postgres(pool: PgPool) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let ledger = PostgresStockLedger::new(pool.clone());
        ledger.run_migrations().await?;
        let order_store = PostgresOrderStore::new(pool.clone());
        order_store.run_migrations().await?;
        let deliveries = PostgresDeliveryStore::new(pool);
        deliveries.run_migrations().await?;

        Ok(Self::new(
            Arc::new(ledger),
            Arc::new(order_store),
            Arc::new(deliveries),
        ))
    }

    pub fn ledger(&self) -> &Arc<dyn StockLedger> {
        self.orders.ledger()
    }
}
