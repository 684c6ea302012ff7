use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::cart::Cart;
use crate::domain::errors::CheckoutError;
use crate::domain::order::{
    InventoryLogRecord, OrderDetailRecord, OrderDraft, OrderRecord, ProductSnapshot,
    StockDecrement,
};
use crate::domain::ports::CheckoutStore;
use crate::models::order::STATUS_PENDING_CONFIRMATION;

/// Converts a cart into a durable order: validates every line against
/// live stock, stages the decrements, one audit log per line, and one
/// detail per line, then commits the lot through the store as a single
/// unit of work. The cart is cleared only after a successful commit.
pub struct CheckoutService<S> {
    store: S,
}

impl<S: CheckoutStore> CheckoutService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order for the cart's current contents.
    ///
    /// Validation failures (empty cart, vanished product, insufficient
    /// stock) are detected before anything is written and leave both the
    /// cart and the store untouched. The order id is assigned here, up
    /// front, so the staged log reasons reference the final order from
    /// the start.
    pub fn place_order(
        &self,
        cart: &mut Cart,
        draft: OrderDraft,
    ) -> Result<Uuid, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order_id = Uuid::new_v4();
        let order = OrderRecord {
            id: order_id,
            customer_id: draft.customer_id,
            status: STATUS_PENDING_CONFIRMATION.to_string(),
            total_amount: cart.total(),
            notes: draft.notes,
            created_at: Utc::now(),
        };

        let product_ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, ProductSnapshot> = self
            .store
            .load_products(&product_ids)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut details = Vec::with_capacity(cart.items().len());
        let mut decrements = Vec::with_capacity(cart.items().len());
        let mut logs = Vec::with_capacity(cart.items().len());

        for item in cart.items() {
            let product = products
                .get(&item.product_id)
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;
            if product.stock_quantity < item.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock_quantity,
                });
            }

            decrements.push(StockDecrement {
                product_id: item.product_id,
                quantity: item.quantity,
            });
            logs.push(InventoryLogRecord {
                id: Uuid::new_v4(),
                product_id: item.product_id,
                quantity_change: -item.quantity,
                new_quantity: product.stock_quantity - item.quantity,
                reason: format!("Sale for order #{order_id}"),
            });
            details.push(OrderDetailRecord {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price.clone(),
            });
        }

        self.store
            .commit_order(&order, &details, &decrements, &logs)?;

        cart.clear();
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartProduct;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        products: Mutex<HashMap<Uuid, ProductSnapshot>>,
        orders: Mutex<Vec<OrderRecord>>,
        details: Mutex<Vec<OrderDetailRecord>>,
        logs: Mutex<Vec<InventoryLogRecord>>,
        fail_commit: AtomicBool,
    }

    impl InMemoryStore {
        fn with_product(self, id: Uuid, stock: i32) -> Self {
            self.products.lock().unwrap().insert(
                id,
                ProductSnapshot {
                    id,
                    name: format!("product {id}"),
                    stock_quantity: stock,
                },
            );
            self
        }

        fn stock_of(&self, id: Uuid) -> i32 {
            self.products.lock().unwrap()[&id].stock_quantity
        }
    }

    impl CheckoutStore for InMemoryStore {
        fn load_products(&self, ids: &[Uuid]) -> Result<Vec<ProductSnapshot>, CheckoutError> {
            let products = self.products.lock().unwrap();
            Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
        }

        fn commit_order(
            &self,
            order: &OrderRecord,
            details: &[OrderDetailRecord],
            decrements: &[StockDecrement],
            logs: &[InventoryLogRecord],
        ) -> Result<(), CheckoutError> {
            if self.fail_commit.load(Ordering::SeqCst) {
                return Err(CheckoutError::Persistence("connection reset".to_string()));
            }
            let mut products = self.products.lock().unwrap();
            for d in decrements {
                let product = products
                    .get_mut(&d.product_id)
                    .ok_or(CheckoutError::ProductNotFound(d.product_id))?;
                if product.stock_quantity < d.quantity {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: d.product_id,
                        requested: d.quantity,
                        available: product.stock_quantity,
                    });
                }
                product.stock_quantity -= d.quantity;
            }
            self.orders.lock().unwrap().push(order.clone());
            self.details.lock().unwrap().extend_from_slice(details);
            self.logs.lock().unwrap().extend_from_slice(logs);
            Ok(())
        }
    }

    fn cart_product(id: Uuid, price: &str) -> CartProduct {
        CartProduct {
            id,
            name: format!("product {id}"),
            price: BigDecimal::from_str(price).unwrap(),
        }
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            customer_id: Uuid::new_v4(),
            notes: None,
        }
    }

    // Cart: A at 10.00 × 2, B at 5.00 × 1.
    fn two_line_cart(a: Uuid, b: Uuid) -> Cart {
        let mut cart = Cart::new();
        let pa = cart_product(a, "10.00");
        let pb = cart_product(b, "5.00");
        cart.add_item(&pa);
        cart.add_item(&pa);
        cart.add_item(&pb);
        cart
    }

    #[test]
    fn successful_checkout_decrements_stock_and_clears_cart() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = InMemoryStore::default()
            .with_product(a, 5)
            .with_product(b, 1);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        let order_id = service.place_order(&mut cart, draft()).unwrap();

        assert!(cart.is_empty());
        assert_eq!(service.store.stock_of(a), 3);
        assert_eq!(service.store.stock_of(b), 0);

        let orders = service.store.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order_id);
        assert_eq!(orders[0].status, STATUS_PENDING_CONFIRMATION);
        assert_eq!(orders[0].total_amount, BigDecimal::from_str("25.00").unwrap());
    }

    #[test]
    fn successful_checkout_writes_one_detail_per_cart_line() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = InMemoryStore::default()
            .with_product(a, 5)
            .with_product(b, 1);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        let order_id = service.place_order(&mut cart, draft()).unwrap();

        let details = service.store.details.lock().unwrap();
        assert_eq!(details.len(), 2);
        assert!(details.iter().all(|d| d.order_id == order_id));
        let line_a = details.iter().find(|d| d.product_id == a).unwrap();
        assert_eq!(line_a.quantity, 2);
        assert_eq!(line_a.unit_price, BigDecimal::from_str("10.00").unwrap());
    }

    #[test]
    fn audit_logs_carry_signed_deltas_and_the_final_order_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = InMemoryStore::default()
            .with_product(a, 5)
            .with_product(b, 1);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        let order_id = service.place_order(&mut cart, draft()).unwrap();

        let logs = service.store.logs.lock().unwrap();
        assert_eq!(logs.len(), 2);
        let log_a = logs.iter().find(|l| l.product_id == a).unwrap();
        let log_b = logs.iter().find(|l| l.product_id == b).unwrap();
        assert_eq!(log_a.quantity_change, -2);
        assert_eq!(log_a.new_quantity, 3);
        assert_eq!(log_b.quantity_change, -1);
        assert_eq!(log_b.new_quantity, 0);
        let expected_reason = format!("Sale for order #{order_id}");
        assert!(logs.iter().all(|l| l.reason == expected_reason));
    }

    #[test]
    fn empty_cart_is_rejected_before_any_lookup() {
        // No products seeded: a lookup attempt would return nothing and
        // fail later with ProductNotFound, so EmptyCart proves the
        // short-circuit.
        let service = CheckoutService::new(InMemoryStore::default());
        let mut cart = Cart::new();
        let err = service.place_order(&mut cart, draft()).unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn insufficient_stock_aborts_with_no_state_change() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = InMemoryStore::default()
            .with_product(a, 5)
            .with_product(b, 0);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        let err = service.place_order(&mut cart, draft()).unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { product_id, requested: 1, available: 0 }
                if product_id == b
        ));
        assert_eq!(service.store.stock_of(a), 5);
        assert!(service.store.orders.lock().unwrap().is_empty());
        assert!(service.store.logs.lock().unwrap().is_empty());
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn vanished_product_aborts_with_no_state_change() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        // B was removed from the catalog after being added to the cart.
        let store = InMemoryStore::default().with_product(a, 5);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        let err = service.place_order(&mut cart, draft()).unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == b));
        assert_eq!(service.store.stock_of(a), 5);
        assert!(service.store.orders.lock().unwrap().is_empty());
    }

    #[test]
    fn repeated_failing_checkout_leaves_inventory_identical() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let store = InMemoryStore::default()
            .with_product(a, 5)
            .with_product(b, 0);
        let service = CheckoutService::new(store);
        let mut cart = two_line_cart(a, b);

        assert!(service.place_order(&mut cart, draft()).is_err());
        assert!(service.place_order(&mut cart, draft()).is_err());

        assert_eq!(service.store.stock_of(a), 5);
        assert_eq!(service.store.stock_of(b), 0);
        assert!(service.store.orders.lock().unwrap().is_empty());
    }

    #[test]
    fn commit_failure_surfaces_persistence_error_and_keeps_the_cart() {
        let a = Uuid::new_v4();
        let store = InMemoryStore::default().with_product(a, 5);
        store.fail_commit.store(true, Ordering::SeqCst);
        let service = CheckoutService::new(store);
        let mut cart = Cart::new();
        cart.add_item(&cart_product(a, "10.00"));

        let err = service.place_order(&mut cart, draft()).unwrap_err();

        assert!(matches!(err, CheckoutError::Persistence(_)));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(service.store.stock_of(a), 5);
    }
}
