//! End-to-end tests against an in-memory SQLite database.

use chrono::{NaiveDate, Utc};

use loyalty_core::{
    BillItem, BonusKind, Business, CoreError, LedgerEntryKind, LoyaltyConfig, MembershipTier, Money, Offer,
    OfferKind, OfferRejected, Percentage, PointValue, RedemptionRate, RedemptionRejected,
};
use loyalty_db::repository::generate_id;
use loyalty_db::{Database, DbConfig, DbError, NewCustomer};

const BIZ: &str = "00000000-0000-0000-0000-0000000000aa";

async fn setup() -> Database {
    setup_with(LoyaltyConfig::default()).await
}

async fn setup_with(loyalty: LoyaltyConfig) -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let now = Utc::now();

    db.businesses()
        .insert(&Business {
            id: BIZ.to_string(),
            name: "Corner Coffee".to_string(),
            description: None,
            email: None,
            phone: None,
            address: None,
            website: None,
            loyalty,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    for (name, at, pct) in [("Bronze", 0, 5), ("Silver", 500, 10), ("Gold", 1000, 15)] {
        db.tiers()
            .insert(&MembershipTier {
                id: name.to_lowercase(),
                business_id: BIZ.to_string(),
                name: name.to_string(),
                description: None,
                points_required: at,
                discount: Percentage::from_percent(pct),
                benefits: vec![format!("{pct}% off")],
                color: None,
            })
            .await
            .unwrap();
    }

    db
}

async fn enrol(db: &Database, first: &str, email: &str) -> loyalty_core::Customer {
    db.customers()
        .insert(&NewCustomer {
            business_id: BIZ.to_string(),
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            phone: None,
            birthday: None,
        })
        .await
        .unwrap()
}

// =============================================================================
// Businesses and tiers
// =============================================================================

#[tokio::test]
async fn test_business_config_roundtrip() {
    let db = setup().await;

    let business = db.businesses().get_by_id(BIZ).await.unwrap().unwrap();
    assert_eq!(business.loyalty, LoyaltyConfig::default());

    let updated = LoyaltyConfig {
        redemption_rate: RedemptionRate::ValuePerPoint(PointValue::from_cents(5)),
        min_redeem_points: 100,
        ..LoyaltyConfig::default()
    };
    db.businesses().update_loyalty_config(BIZ, &updated).await.unwrap();

    let business = db.businesses().get_by_id(BIZ).await.unwrap().unwrap();
    assert_eq!(business.loyalty.redemption_rate, updated.redemption_rate);
    assert_eq!(business.loyalty.min_redeem_points, 100);

    assert!(matches!(
        db.businesses().update_loyalty_config("missing", &updated).await,
        Err(DbError::NotFound { .. })
    ));
    assert_eq!(db.businesses().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_tiers_listed_by_threshold() {
    let db = setup().await;

    let tiers = db.tiers().list_for_business(BIZ).await.unwrap();
    let names: Vec<_> = tiers.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["Bronze", "Silver", "Gold"]);
    assert_eq!(tiers[1].benefits, vec!["10% off".to_string()]);

    db.tiers().delete(BIZ, "gold").await.unwrap();
    assert_eq!(db.tiers().list_for_business(BIZ).await.unwrap().len(), 2);
    assert!(db.tiers().delete(BIZ, "gold").await.is_err());
}

// =============================================================================
// Customers
// =============================================================================

#[tokio::test]
async fn test_enrolment_credits_welcome_bonus() {
    let db = setup().await;
    let customer = enrol(&db, "John", " John.Doe@Email.com ").await;

    assert_eq!(customer.points, 50);
    assert_eq!(customer.email, "john.doe@email.com");
    assert_eq!(customer.tier_id.as_deref(), Some("bronze"));

    let ledger = db.bills().ledger_for_customer(BIZ, &customer.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, LedgerEntryKind::Bonus);
    assert_eq!(ledger[0].points, 50);
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let db = setup().await;
    enrol(&db, "John", "john@email.com").await;

    let err = db
        .customers()
        .insert(&NewCustomer {
            business_id: BIZ.to_string(),
            first_name: "Johnny".to_string(),
            last_name: "Doe".to_string(),
            email: "john@email.com".to_string(),
            ..NewCustomer::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation { .. }));
    assert_eq!(db.customers().count(BIZ).await.unwrap(), 1);
}

#[tokio::test]
async fn test_search_customers() {
    let db = setup().await;
    enrol(&db, "John", "john@email.com").await;
    enrol(&db, "Jane", "jane.smith@email.com").await;

    assert_eq!(db.customers().search(BIZ, "", 20).await.unwrap().len(), 2);
    assert_eq!(db.customers().search(BIZ, "ja", 20).await.unwrap().len(), 1);
    assert_eq!(db.customers().search(BIZ, "smith", 20).await.unwrap().len(), 1);
    assert_eq!(db.customers().search(BIZ, "doe", 20).await.unwrap().len(), 2);
    assert!(db.customers().search("other-business", "", 20).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let db = setup().await;
    enrol(&db, "John", "john@email.com").await;
    enrol(&db, "Jane", "jane@email.com").await;
    enrol(&db, "Jo", "jo_ann@email.com").await;

    assert!(db.customers().search(BIZ, "J_", 20).await.unwrap().is_empty());
    assert!(db.customers().search(BIZ, "%", 20).await.unwrap().is_empty());

    let hits = db.customers().search(BIZ, "o_a", 20).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].email, "jo_ann@email.com");
}

#[tokio::test]
async fn test_bonus_and_adjustment_move_tier() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;

    let balance = db
        .customers()
        .award_bonus(BIZ, &customer.id, BonusKind::Referral)
        .await
        .unwrap();
    assert_eq!(balance, 250);

    let balance = db
        .customers()
        .adjust_points(BIZ, &customer.id, 400, Some("migration"))
        .await
        .unwrap();
    assert_eq!(balance, 650);

    let customer = db.customers().get_by_id(BIZ, &customer.id).await.unwrap().unwrap();
    assert_eq!(customer.tier_id.as_deref(), Some("silver"));
}

#[tokio::test]
async fn test_adjustment_never_goes_negative() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;

    let err = db
        .customers()
        .adjust_points(BIZ, &customer.id, -51, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));

    let balance = db.customers().adjust_points(BIZ, &customer.id, -50, None).await.unwrap();
    assert_eq!(balance, 0);

    let err = db.customers().adjust_points(BIZ, "nobody", 10, None).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_silver_customer_with_redemption() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;
    db.customers().adjust_points(BIZ, &customer.id, 600, None).await.unwrap(); // 650, Silver

    let receipt = db
        .checkout(BIZ, &customer.id, Money::from_cents(10_000), 500)
        .await
        .unwrap();

    // $100 - 10% - 500 pts ($5) = $85; earned on $90
    assert_eq!(receipt.bill.discount_cents, 1_000);
    assert_eq!(receipt.bill.redemption_cents, 500);
    assert_eq!(receipt.bill.total_cents, 8_500);
    assert_eq!(receipt.bill.points_earned, 90);
    assert_eq!(receipt.bill.points_redeemed, 500);
    assert_eq!(receipt.bill.balance_after, 650 - 500 + 90);
    assert_eq!(receipt.customer.points, 240);
    assert_eq!(receipt.customer.tier_id.as_deref(), Some("bronze"));
    assert_eq!(receipt.customer.total_spent_cents, 8_500);
    assert!(receipt.customer.last_purchase_at.is_some());

    let stored = db.bills().get_by_id(BIZ, &receipt.bill.id).await.unwrap().unwrap();
    assert_eq!(stored.total_cents, 8_500);

    let ledger = db.bills().ledger_for_customer(BIZ, &customer.id).await.unwrap();
    let bill_entries: Vec<_> = ledger
        .iter()
        .filter(|e| e.bill_id.as_deref() == Some(receipt.bill.id.as_str()))
        .map(|e| (e.kind, e.points))
        .collect();
    assert_eq!(
        bill_entries,
        [(LedgerEntryKind::Redemption, -500), (LedgerEntryKind::Accrual, 90)]
    );

    let net: i64 = ledger.iter().map(|e| e.points).sum();
    assert_eq!(net, 240);
}

#[tokio::test]
async fn test_checkout_rejected_redemption_writes_nothing() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;

    let err = db
        .checkout(BIZ, &customer.id, Money::from_cents(10_000), 100)
        .await
        .unwrap_err();
    assert_eq!(
        err.redemption_rejection(),
        Some(RedemptionRejected::ExceedsBalance {
            requested: 100,
            balance: 50
        })
    );

    db.customers().adjust_points(BIZ, &customer.id, 400, None).await.unwrap(); // 450
    let err = db
        .checkout(BIZ, &customer.id, Money::from_cents(10_000), 450)
        .await
        .unwrap_err();
    assert_eq!(
        err.redemption_rejection(),
        Some(RedemptionRejected::BelowMinimum {
            requested: 450,
            minimum: 500
        })
    );

    assert!(db.bills().list_for_customer(BIZ, &customer.id, 10).await.unwrap().is_empty());
    let customer = db.customers().get_by_id(BIZ, &customer.id).await.unwrap().unwrap();
    assert_eq!(customer.points, 450);
}

#[tokio::test]
async fn test_checkout_without_redemption_earns_on_discounted_amount() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await; // Bronze, 5%

    let receipt = db
        .checkout(BIZ, &customer.id, Money::from_cents(1_099), 0)
        .await
        .unwrap();

    // 5% of $10.99 = $0.5495; net $10.4405
    assert_eq!(receipt.bill.discount_cents, 55);
    assert_eq!(receipt.bill.total_cents, 1_044);
    assert_eq!(receipt.bill.points_earned, 10);
    assert_eq!(receipt.customer.points, 60);
}

#[tokio::test]
async fn test_checkout_negative_total_is_recorded() {
    let loyalty = LoyaltyConfig {
        redemption_rate: RedemptionRate::ValuePerPoint(PointValue::from_cents(5)),
        min_redeem_points: 100,
        ..LoyaltyConfig::default()
    };
    let db = setup_with(loyalty).await;
    let customer = enrol(&db, "John", "john@email.com").await;
    db.customers().adjust_points(BIZ, &customer.id, 1_150, None).await.unwrap(); // 1200, Gold

    // $50 - 15% ($7.50) - 1200 pts × $0.05 ($60) = -$17.50
    let receipt = db
        .checkout(BIZ, &customer.id, Money::from_cents(5_000), 1_200)
        .await
        .unwrap();

    assert_eq!(receipt.bill.total_cents, -1_750);
    assert_eq!(receipt.bill.points_earned, 42);
    assert_eq!(receipt.customer.points, 42);
    assert_eq!(receipt.customer.total_spent_cents, 0);
}

#[tokio::test]
async fn test_checkout_itemised_bill() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await; // Bronze, 5%

    let items = [
        BillItem::new("Latte", Money::from_cents(475), 2),
        BillItem::new("Scone", Money::from_cents(350), 1),
    ];
    let receipt = db.checkout_items(BIZ, &customer.id, &items, 0).await.unwrap();

    // $13.00 - 5% ($0.65) = $12.35
    assert_eq!(receipt.bill.purchase_cents, 1_300);
    assert_eq!(receipt.bill.total_cents, 1_235);
    assert_eq!(receipt.bill.points_earned, 12);
    assert_eq!(receipt.customer.points, 62);

    let err = db
        .checkout_items(BIZ, &customer.id, &[BillItem::new("Latte", Money::from_cents(475), 0)], 0)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    assert_eq!(db.bills().list_for_customer(BIZ, &customer.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_rejects_negative_purchase_and_unknown_customer() {
    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;

    let err = db
        .checkout(BIZ, &customer.id, Money::from_cents(-1), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

    let err = db.checkout(BIZ, "nobody", Money::from_cents(100), 0).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn test_record_refuses_stale_redemption() {
    use loyalty_core::ledger::{compute_bill, BillInput, RedemptionRequest};

    let db = setup().await;
    let customer = enrol(&db, "John", "john@email.com").await;
    db.customers().adjust_points(BIZ, &customer.id, 550, None).await.unwrap(); // 600

    // computed against 600 points...
    let breakdown = compute_bill(
        &LoyaltyConfig::default(),
        BillInput {
            purchase: Money::from_cents(2_000),
            balance: 600,
            redeem: RedemptionRequest::of(600),
        },
    );

    // ...but another counter spent some in the meantime
    db.customers().adjust_points(BIZ, &customer.id, -200, None).await.unwrap();

    let err = db.bills().record(BIZ, &customer.id, &breakdown).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)));

    let customer = db.customers().get_by_id(BIZ, &customer.id).await.unwrap().unwrap();
    assert_eq!(customer.points, 400);
}

// =============================================================================
// Offers
// =============================================================================

fn offer(max_uses: Option<u32>) -> Offer {
    Offer {
        id: generate_id(),
        business_id: BIZ.to_string(),
        title: "First Time Bonus".to_string(),
        description: None,
        kind: OfferKind::FixedAmount(Money::from_cents(1_000)),
        min_purchase: Money::from_cents(2_500),
        max_uses,
        valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        valid_until: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        is_active: true,
        used_count: 0,
    }
}

#[tokio::test]
async fn test_offer_roundtrip_and_toggle() {
    let db = setup().await;
    let created = offer(Some(50));
    db.offers().insert(&created).await.unwrap();

    let listed = db.offers().list_for_business(BIZ).await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    db.offers().set_active(BIZ, &created.id, false).await.unwrap();
    let stored = db.offers().get_by_id(BIZ, &created.id).await.unwrap().unwrap();
    assert_eq!(
        stored.check(Money::from_cents(5_000), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
        Err(OfferRejected::Inactive)
    );
}

#[tokio::test]
async fn test_offer_usage_capped() {
    let db = setup().await;
    let capped = offer(Some(2));
    db.offers().insert(&capped).await.unwrap();

    assert_eq!(db.offers().record_use(BIZ, &capped.id).await.unwrap(), 1);
    assert_eq!(db.offers().record_use(BIZ, &capped.id).await.unwrap(), 2);

    let err = db.offers().record_use(BIZ, &capped.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Core(CoreError::Offer(OfferRejected::UsageExhausted { max_uses: 2 }))
    ));

    let unlimited = offer(None);
    db.offers().insert(&unlimited).await.unwrap();
    for expected in 1..=5 {
        assert_eq!(db.offers().record_use(BIZ, &unlimited.id).await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_offer_use_on_missing_or_foreign_offer() {
    let db = setup().await;
    let capped = offer(Some(1));
    db.offers().insert(&capped).await.unwrap();

    let err = db.offers().record_use(BIZ, "no-such-offer").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));

    // Another business cannot spend this business's offer.
    let err = db.offers().record_use("other-business", &capped.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));

    assert_eq!(db.offers().record_use(BIZ, &capped.id).await.unwrap(), 1);
    assert!(db.offers().record_use(BIZ, &capped.id).await.is_err());
    let stored = db.offers().get_by_id(BIZ, &capped.id).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);
}
