use transit_store::BalanceStore;
use uuid::Uuid;

use crate::error::BillingError;

/// Round to the 4 fractional digits of significance the balance store
/// carries
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Metered cost of a sync call, in account currency
pub fn token_cost(
    prompt_tokens: u32,
    completion_tokens: u32,
    price_per_1k_input: f64,
    price_per_1k_output: f64,
) -> f64 {
    let input = f64::from(prompt_tokens) * price_per_1k_input / 1000.0;
    let output = f64::from(completion_tokens) * price_per_1k_output / 1000.0;
    round4(input + output)
}

/// User-facing billing operations over the balance store
///
/// Async flows reserve funds up front (`pre_deduct`) and compensate
/// with `refund`; sync flows charge the metered amount afterwards
/// (`post_deduct`), which is allowed to overdraw.
#[derive(Clone)]
pub struct BillingService {
    balances: BalanceStore,
}

impl BillingService {
    pub fn new(balances: BalanceStore) -> Self {
        Self { balances }
    }

    /// Reserve a known amount before dispatch
    ///
    /// On success the balance is guaranteed non-negative. The caller
    /// owes exactly one `refund` if the dispatch later fails.
    pub async fn pre_deduct(&self, user_id: Uuid, amount: f64) -> Result<(), BillingError> {
        if amount <= 0.0 {
            return Err(BillingError::InvalidAmount(amount));
        }

        if self.balances.deduct(user_id, amount).await? {
            tracing::debug!(%user_id, amount, "pre-deducted");
            Ok(())
        } else {
            Err(BillingError::InsufficientBalance)
        }
    }

    /// Charge the exact metered amount after a sync response
    ///
    /// Unconditional: a response that consumed more than the advisory
    /// precheck estimated drives the balance negative, and subsequent
    /// prechecks deny the user until a recharge. Returns the amount
    /// charged.
    pub async fn post_deduct(
        &self,
        user_id: Uuid,
        prompt_tokens: u32,
        completion_tokens: u32,
        price_per_1k_input: f64,
        price_per_1k_output: f64,
    ) -> Result<f64, BillingError> {
        let cost = token_cost(prompt_tokens, completion_tokens, price_per_1k_input, price_per_1k_output);
        if cost <= 0.0 {
            return Ok(0.0);
        }

        self.balances.incr(user_id, -cost).await?;
        tracing::debug!(%user_id, cost, prompt_tokens, completion_tokens, "post-deducted");
        Ok(cost)
    }

    /// Return a previously deducted amount (failure compensation)
    pub async fn refund(&self, user_id: Uuid, amount: f64) -> Result<(), BillingError> {
        if amount <= 0.0 {
            return Err(BillingError::InvalidAmount(amount));
        }

        self.balances.incr(user_id, amount).await?;
        tracing::info!(%user_id, amount, "refunded");
        Ok(())
    }

    /// Admin-initiated credit
    pub async fn recharge(&self, user_id: Uuid, amount: f64) -> Result<(), BillingError> {
        if amount <= 0.0 {
            return Err(BillingError::InvalidAmount(amount));
        }

        self.balances.incr(user_id, amount).await?;
        tracing::info!(%user_id, amount, "recharged");
        Ok(())
    }

    /// Current balance; unknown users read zero
    pub async fn balance(&self, user_id: Uuid) -> Result<f64, BillingError> {
        Ok(self.balances.read(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> BillingService {
        BillingService::new(BalanceStore::in_memory())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn recharge_then_read_adds_exactly() {
        let billing = service();
        let user = Uuid::new_v4();

        let before = billing.balance(user).await.unwrap();
        billing.recharge(user, 25.5).await.unwrap();
        assert!(close(billing.balance(user).await.unwrap(), before + 25.5));
    }

    #[tokio::test]
    async fn pre_deduct_then_refund_is_identity() {
        let billing = service();
        let user = Uuid::new_v4();
        billing.recharge(user, 10.0).await.unwrap();

        billing.pre_deduct(user, 3.25).await.unwrap();
        billing.refund(user, 3.25).await.unwrap();
        assert!(close(billing.balance(user).await.unwrap(), 10.0));
    }

    #[tokio::test]
    async fn pre_deduct_never_leaves_a_negative_balance() {
        let billing = service();
        let user = Uuid::new_v4();
        billing.recharge(user, 0.5).await.unwrap();

        let err = billing.pre_deduct(user, 2.0).await.unwrap_err();
        assert!(matches!(err, BillingError::InsufficientBalance));
        assert!(close(billing.balance(user).await.unwrap(), 0.5));

        billing.pre_deduct(user, 0.5).await.unwrap();
        assert!(billing.balance(user).await.unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn post_deduct_matches_the_price_sheet() {
        let billing = service();
        let user = Uuid::new_v4();
        billing.recharge(user, 100.0).await.unwrap();

        let cost = billing.post_deduct(user, 500, 500, 0.01, 0.02).await.unwrap();
        assert!(close(cost, 0.015));
        assert!(close(billing.balance(user).await.unwrap(), 99.985));
    }

    #[tokio::test]
    async fn post_deduct_may_overdraw() {
        let billing = service();
        let user = Uuid::new_v4();
        billing.recharge(user, 0.01).await.unwrap();

        billing.post_deduct(user, 10_000, 10_000, 1.0, 1.0).await.unwrap();
        assert!(billing.balance(user).await.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn zero_usage_charges_nothing() {
        let billing = service();
        let user = Uuid::new_v4();
        billing.recharge(user, 5.0).await.unwrap();

        let cost = billing.post_deduct(user, 0, 0, 0.01, 0.02).await.unwrap();
        assert!(close(cost, 0.0));
        assert!(close(billing.balance(user).await.unwrap(), 5.0));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let billing = service();
        let user = Uuid::new_v4();

        assert!(matches!(
            billing.pre_deduct(user, 0.0).await.unwrap_err(),
            BillingError::InvalidAmount(_)
        ));
        assert!(matches!(
            billing.refund(user, -1.0).await.unwrap_err(),
            BillingError::InvalidAmount(_)
        ));
        assert!(matches!(
            billing.recharge(user, 0.0).await.unwrap_err(),
            BillingError::InvalidAmount(_)
        ));
    }

    #[test]
    fn token_cost_rounds_to_four_digits() {
        assert!(close(token_cost(333, 0, 0.01, 0.02), 0.0033));
        assert!(close(token_cost(500, 500, 0.01, 0.02), 0.015));
    }
}
