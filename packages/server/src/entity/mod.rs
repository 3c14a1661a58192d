pub mod dead_letter_item;
pub mod shipment;
