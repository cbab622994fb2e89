use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cardmarket_core::assets::{AssetRepository, AssetService, AssetUpdate, NewAsset};
use cardmarket_core::cache::QueryCacheConfig;
use cardmarket_core::dashboard::{MarketFilter, MarketTab, SortOption};
use cardmarket_core::markets::{
    InMemoryCatalogSource, MarketRepository, MarketService, Rarity, TrendPeriod,
};
use cardmarket_core::queries::QueryService;

fn build_service(subscription_interval: Duration) -> QueryService {
    let source = Arc::new(InMemoryCatalogSource::with_latency(Duration::from_millis(5)));
    let repository = Arc::new(MarketRepository::with_subscription_interval(
        source,
        subscription_interval,
    ));
    let markets = Arc::new(MarketService::new(repository));
    let assets = Arc::new(AssetService::new(Arc::new(
        AssetRepository::with_seed_holdings(),
    )));
    QueryService::new(markets, assets, QueryCacheConfig::default())
}

#[tokio::test]
async fn dashboard_flow_over_the_seeded_catalog() {
    let service = build_service(Duration::from_secs(5));
    let _watch = service.watch_markets();

    // full catalog arrives sorted by market cap
    let snapshot = service.markets().await;
    let markets = snapshot.markets().unwrap();
    assert_eq!(markets.len(), 20);
    assert_eq!(markets[0].symbol, "UMB-VMAX-ALT");
    assert!(!snapshot.is_loading());

    // default dashboard view: hot tab, newest first; undated entries last
    let default_view = service.markets_filtered(&MarketFilter::default()).await;
    let symbols: Vec<_> = default_view
        .markets
        .iter()
        .map(|m| m.symbol.as_str())
        .collect();
    assert_eq!(symbols, vec!["ION-SIR", "UMB-VMAX-ALT", "MAG-COM"]);

    // search narrows by name or symbol, case-insensitively
    let search = MarketFilter {
        search: "charizard".to_string(),
        tab: MarketTab::Normal,
        sort: SortOption::PriceDesc,
        ..Default::default()
    };
    let hits = service.markets_filtered(&search).await;
    let symbols: Vec<_> = hits.markets.iter().map(|m| m.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["CRZ-GX-SH", "CRZ-CLS"]);

    // rarity selection composes with the tab partition
    let commons = MarketFilter {
        rarities: vec![Rarity::Common],
        tab: MarketTab::Normal,
        sort: SortOption::PriceAsc,
        ..Default::default()
    };
    let hits = service.markets_filtered(&commons).await;
    assert_eq!(hits.markets.len(), 5);
    assert_eq!(hits.markets[0].symbol, "MAG-COM");

    // single-market read accepts unnormalized input
    let market = service.market(" pku-vmax-rb ").await.unwrap();
    assert_eq!(market.market().unwrap().id, "1");
}

#[tokio::test]
async fn trend_aggregates_come_from_the_repository_seam() {
    let source = Arc::new(InMemoryCatalogSource::with_latency(Duration::ZERO));
    let markets = MarketService::new(Arc::new(MarketRepository::new(source)));

    let trend = markets
        .get_market_trend("pku-vmax-rb", TrendPeriod::Day7)
        .await
        .unwrap();
    assert_eq!(trend.period, TrendPeriod::Day7);
    assert!(trend.high >= trend.average && trend.average >= trend.low);

    let missing = markets
        .get_market_trend("ZZZ-404", TrendPeriod::Hour24)
        .await
        .unwrap_err();
    assert!(missing.to_string().contains("Not found"));
}

#[tokio::test]
async fn live_subscription_stops_cleanly_mid_flight() {
    let service = build_service(Duration::from_millis(20));

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let subscription = service
        .subscribe_to_market(
            "MAG-COM",
            Arc::new(move |market| {
                assert_eq!(market.symbol, "MAG-COM");
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(fired.load(Ordering::SeqCst) >= 2);

    subscription.unsubscribe();
    subscription.unsubscribe();
    let at_cancel = fired.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), at_cancel);
}

#[tokio::test]
async fn asset_mutations_flow_back_into_cached_reads() {
    let service = build_service(Duration::from_secs(5));

    let before = service.assets().await;
    assert_eq!(before.assets().unwrap().len(), 2);

    service
        .add_asset(NewAsset {
            symbol: "SNO-REV".to_string(),
            name: "Snorlax (Reverse Holo)".to_string(),
            amount: 1,
            value: rust_decimal_macros::dec!(450_000),
            rarity: Rarity::Rare,
            rarity_label: Some("Reverse Holo".to_string()),
        })
        .await
        .unwrap();

    // the invalidated entry revalidates behind the stale read
    service.assets().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let after = service.assets().await;
    assert_eq!(after.assets().unwrap().len(), 3);

    service
        .update_asset(
            "sno-rev",
            AssetUpdate {
                amount: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    service.assets().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let final_read = service.assets().await;
    let snorlax = final_read
        .assets()
        .unwrap()
        .iter()
        .find(|a| a.symbol == "SNO-REV")
        .cloned()
        .unwrap();
    assert_eq!(snorlax.amount, 4);
}
