mod order_number;
mod validation;

pub use order_number::{OrderNumberGenerator, SequentialOrderNumbers, ORDER_SEQUENCE_MODULUS};
pub use validation::{
    is_valid_email,
    parse_status_list,
    validate_customer,
    validate_line_items,
    validate_new_variation,
    validate_vendor_note,
    ValidationError,
};
