use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::entities::order;
use crate::errors::ServiceError;

const SEED: &str = "1";
const SEED_WIDTH: usize = 4;

/// Next invoice number: the most recent order's number incremented and
/// left-zero-padded to the same width. With no prior order the seed `"1"`
/// is right-padded with zeros to four characters (`"1000"`).
pub async fn next_invoice_number(db: &DatabaseConnection) -> Result<String, ServiceError> {
    let last_order = order::Entity::find()
        .order_by_desc(order::Column::CreatedAt)
        .one(db)
        .await?;

    Ok(match last_order {
        Some(order) => increment(&order.invoice_number),
        None => seed(),
    })
}

fn increment(last: &str) -> String {
    let width = last.len();
    match last.parse::<u64>() {
        Ok(n) => format!("{:0>width$}", n + 1, width = width),
        // A non-numeric invoice number restarts the sequence.
        Err(_) => seed(),
    }
}

fn seed() -> String {
    format!("{:0<width$}", SEED, width = SEED_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0005", "0006")]
    #[case("0009", "0010")]
    #[case("0099", "0100")]
    #[case("1000", "1001")]
    #[case("9999", "10000")]
    fn increments_preserve_padding_width(#[case] last: &str, #[case] expected: &str) {
        assert_eq!(increment(last), expected);
    }

    #[test]
    fn seed_is_right_padded_to_four_chars() {
        assert_eq!(seed(), "1000");
    }

    #[test]
    fn garbage_invoice_number_restarts_the_sequence() {
        assert_eq!(increment("INV-XYZ"), "1000");
    }
}
