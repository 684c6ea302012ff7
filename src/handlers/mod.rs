pub mod cart;
pub mod orders;
pub mod products;
pub mod purchase_orders;
pub mod shipments;
pub mod suppliers;
