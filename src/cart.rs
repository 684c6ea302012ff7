//! In-memory, session-scoped shopping cart.
//!
//! A cart holds one line per product, snapshotting name and price at
//! add-time. Every mutating operation fires the registered change
//! observers synchronously, in registration order, after the mutation
//! has been applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use uuid::Uuid;

/// Catalog data a cart needs to open a line.
#[derive(Debug, Clone)]
pub struct CartProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

type Observer = Box<dyn Fn() + Send>;

#[derive(Default)]
pub struct Cart {
    items: Vec<CartItem>,
    observers: Vec<Observer>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Registers a change observer. Observers fire after every mutating
    /// operation, in the order they were registered.
    pub fn on_change(&mut self, observer: impl Fn() + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Adds one unit of `product`. An existing line for the same product
    /// is incremented; otherwise a new line snapshots name and price.
    pub fn add_item(&mut self, product: &CartProduct) {
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => item.quantity += 1,
            None => self.items.push(CartItem {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price.clone(),
                quantity: 1,
            }),
        }
        self.notify();
    }

    /// Sets the quantity of an existing line; a quantity of zero or less
    /// removes the line. No-op (and no notification) if the product is
    /// not in the cart.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i32) {
        let Some(pos) = self.items.iter().position(|i| i.product_id == product_id) else {
            return;
        };
        if quantity > 0 {
            self.items[pos].quantity = quantity;
        } else {
            self.items.remove(pos);
        }
        self.notify();
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        let Some(pos) = self.items.iter().position(|i| i.product_id == product_id) else {
            return;
        };
        self.items.remove(pos);
        self.notify();
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.notify();
    }

    /// Sum of unit price × quantity over all lines, recomputed on every
    /// call.
    pub fn total(&self) -> BigDecimal {
        self.items.iter().fold(BigDecimal::from(0), |acc, i| {
            acc + &i.unit_price * BigDecimal::from(i.quantity)
        })
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer();
        }
    }
}

/// Carts keyed by session id. Carts are created on first touch; sessions
/// never share a cart, and within one session operations arrive
/// sequentially.
///
/// Each cart sits behind its own lock: the registry map is only locked
/// long enough to fetch or create the session's entry, so a slow
/// operation against one cart (checkout holds its cart across the
/// database commit) never blocks other sessions.
#[derive(Default)]
pub struct SessionCarts {
    carts: Mutex<HashMap<Uuid, Arc<Mutex<Cart>>>>,
}

impl SessionCarts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the session's cart, creating an empty cart if the
    /// session has none yet. Only this session's cart stays locked while
    /// `f` runs.
    pub fn with_cart<R>(&self, session_id: Uuid, f: impl FnOnce(&mut Cart) -> R) -> R {
        let cart = {
            let mut carts = self.carts.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(carts.entry(session_id).or_default())
        };
        let mut cart = cart.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn product(price: &str) -> CartProduct {
        CartProduct {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            price: BigDecimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn adding_same_product_twice_merges_into_one_line() {
        let mut cart = Cart::new();
        let p = product("10.00");
        cart.add_item(&p);
        cart.add_item(&p);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn add_snapshots_name_and_price() {
        let mut cart = Cart::new();
        let p = product("9.99");
        cart.add_item(&p);
        let item = &cart.items()[0];
        assert_eq!(item.product_name, "Widget");
        assert_eq!(item.unit_price, BigDecimal::from_str("9.99").unwrap());
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn set_quantity_zero_removes_the_line() {
        let mut cart = Cart::new();
        let p = product("10.00");
        cart.add_item(&p);
        cart.set_quantity(p.id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn set_quantity_updates_existing_line() {
        let mut cart = Cart::new();
        let p = product("10.00");
        cart.add_item(&p);
        cart.set_quantity(p.id, 7);
        assert_eq!(cart.items()[0].quantity, 7);
    }

    #[test]
    fn set_quantity_on_absent_product_is_a_noop() {
        let mut cart = Cart::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        cart.on_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cart.set_quantity(Uuid::new_v4(), 3);
        assert!(cart.is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn total_reflects_price_times_quantity() {
        let mut cart = Cart::new();
        let a = product("10.00");
        let b = product("5.00");
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);
        assert_eq!(cart.total(), BigDecimal::from_str("25.00").unwrap());
        cart.remove_item(b.id);
        assert_eq!(cart.total(), BigDecimal::from_str("20.00").unwrap());
        cart.clear();
        assert_eq!(cart.total(), BigDecimal::from(0));
    }

    #[test]
    fn observers_fire_after_each_mutation_in_registration_order() {
        let mut cart = Cart::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second"] {
            let log = Arc::clone(&log);
            cart.on_change(move || log.lock().unwrap().push(label));
        }
        let p = product("1.00");
        cart.add_item(&p);
        cart.set_quantity(p.id, 4);
        cart.clear();
        let fired = log.lock().unwrap();
        assert_eq!(
            *fired,
            vec!["first", "second", "first", "second", "first", "second"]
        );
    }

    #[test]
    fn busy_cart_does_not_block_other_sessions() {
        use std::sync::mpsc;
        use std::thread;

        let carts = Arc::new(SessionCarts::new());
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        // Session A's cart stays locked until released, standing in for a
        // checkout that is mid database commit.
        let worker = {
            let carts = Arc::clone(&carts);
            thread::spawn(move || {
                carts.with_cart(session_a, |cart| {
                    cart.add_item(&product("2.00"));
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                });
            })
        };
        entered_rx.recv().unwrap();

        // Other sessions keep working while A's cart is held.
        let b_len = carts.with_cart(session_b, |cart| cart.items().len());
        assert_eq!(b_len, 0);

        release_tx.send(()).unwrap();
        worker.join().unwrap();
        let a_len = carts.with_cart(session_a, |cart| cart.items().len());
        assert_eq!(a_len, 1);
    }

    #[test]
    fn session_carts_are_isolated() {
        let carts = SessionCarts::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        let p = product("3.00");
        carts.with_cart(session_a, |cart| cart.add_item(&p));
        let b_len = carts.with_cart(session_b, |cart| cart.items().len());
        assert_eq!(b_len, 0);
        let a_len = carts.with_cart(session_a, |cart| cart.items().len());
        assert_eq!(a_len, 1);
    }
}
