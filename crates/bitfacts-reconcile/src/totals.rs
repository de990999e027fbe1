//! Order total arithmetic, identical on both sides of the audit.

use bitfacts_core::Decimal;

use crate::error::ReconcileError;

/// Raw text of one detail line as read from either side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailLine {
    pub unit_price: Option<String>,
    pub quantity: Option<String>,
    pub discount: Option<String>,
}

fn amount(order_id: &str, column: &'static str, raw: Option<&str>) -> Result<Decimal, ReconcileError> {
    let text = raw.unwrap_or("").trim();
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::parse(text).ok_or_else(|| ReconcileError::InvalidAmount {
        order_id: order_id.to_string(),
        column,
        value: text.to_string(),
    })
}

/// `Σ unitPrice × quantity × (1 − discount)`, rounded half-up to cents.
///
/// Missing or empty cells count as zero. Summation is exact; only the final
/// total is rounded.
pub fn order_total<'a>(
    order_id: &str,
    lines: impl IntoIterator<Item = &'a DetailLine>,
) -> Result<Decimal, ReconcileError> {
    let overflow = || ReconcileError::Overflow {
        order_id: order_id.to_string(),
    };
    let mut total = Decimal::ZERO;
    for line in lines {
        let price = amount(order_id, "UnitPrice", line.unit_price.as_deref())?;
        let qty = amount(order_id, "Quantity", line.quantity.as_deref())?;
        let disc = amount(order_id, "Discount", line.discount.as_deref())?;
        let net = Decimal::ONE.checked_sub(disc).ok_or_else(overflow)?;
        let value = price
            .checked_mul(qty)
            .and_then(|v| v.checked_mul(net))
            .ok_or_else(overflow)?;
        total = total.checked_add(value).ok_or_else(overflow)?;
    }
    total.round_money().map_err(|_| overflow())
}

/// Difference of two rounded totals, rounded again.
pub fn diff(order_id: &str, left: Decimal, right: Decimal) -> Result<Decimal, ReconcileError> {
    left.checked_sub(right)
        .and_then(|d| d.round_half_up(2))
        .ok_or_else(|| ReconcileError::Overflow {
            order_id: order_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(p: &str, q: &str, d: &str) -> DetailLine {
        DetailLine {
            unit_price: Some(p.into()),
            quantity: Some(q.into()),
            discount: Some(d.into()),
        }
    }

    #[test]
    fn half_cent_rounds_up() {
        let t = order_total("10249", &[line("19.995", "3", "0")]).unwrap();
        assert_eq!(t.to_string(), "59.99");
    }

    #[test]
    fn only_the_final_sum_is_rounded() {
        // 142.8 + 6258.125 = 6400.925
        let t = order_total("10250", &[line("14", "12", "0.15"), line("263.5", "25", "0.05")]).unwrap();
        assert_eq!(t.to_string(), "6400.93");
    }

    #[test]
    fn empty_order_and_missing_cells_are_zero() {
        assert_eq!(order_total("1", &[]).unwrap().to_string(), "0.00");
        let partial = DetailLine {
            unit_price: Some("10".into()),
            quantity: Some("2".into()),
            discount: None,
        };
        assert_eq!(order_total("1", &[partial]).unwrap().to_string(), "20.00");
    }

    #[test]
    fn garbage_amount_is_reported() {
        let err = order_total("7", &[line("abc", "1", "0")]).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidAmount { column: "UnitPrice", .. }));
    }

    #[test]
    fn diff_is_rounded() {
        let d = diff("1", Decimal::parse("10.5").unwrap(), Decimal::parse("10.25").unwrap()).unwrap();
        assert_eq!(d.to_string(), "0.25");
        let z = diff("1", Decimal::parse("1.00").unwrap(), Decimal::parse("1").unwrap()).unwrap();
        assert_eq!(z.to_string(), "0.00");
    }
}
