pub mod inventory_log;
pub mod order;
pub mod order_detail;
pub mod product;
pub mod purchase_order;
pub mod shipment;
pub mod supplier;
