mod handlers;

use chain::Address;
use wallet::WalletID;
use warp::Filter;

use super::response::respond;
use super::types::{FormatParams, PageParams};
use super::{with_chain, with_wallets, ChainRef, WalletsRef};

pub fn routes(
    cm: ChainRef,
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    list(wm.clone())
        .or(create(wm.clone()))
        .or(update(wm.clone()))
        .or(delete(wm.clone()))
        .or(addresses_put(wm.clone()))
        .or(addresses_get(wm.clone()))
        .or(address_delete(wm.clone()))
        .or(balance(wm.clone()))
        .or(events(wm.clone()))
        .or(pool(cm, wm.clone()))
        .or(outputs_siacoin(wm.clone()))
        .or(outputs_siafund(wm.clone()))
        .or(reserve(wm.clone()))
        .or(release(wm.clone()))
        .or(fund(wm.clone()))
        .or(fund_siafund(wm.clone()))
        .or(resubscribe(wm))
}

fn list(wm: WalletsRef) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets")
        .and(get())
        .and(with_wallets(wm))
        .then(handlers::list)
        .map(respond)
}

fn create(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::create)
        .map(respond)
}

fn update(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID)
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::update)
        .map(respond)
}

fn delete(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID)
        .and(warp::delete())
        .and(with_wallets(wm))
        .then(handlers::delete)
        .map(respond)
}

fn addresses_put(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "addresses")
        .and(put())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::add_address)
        .map(respond)
}

fn addresses_get(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "addresses")
        .and(get())
        .and(with_wallets(wm))
        .then(handlers::addresses)
        .map(respond)
}

fn address_delete(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "addresses" / Address)
        .and(warp::delete())
        .and(with_wallets(wm))
        .then(handlers::remove_address)
        .map(respond)
}

fn balance(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "balance")
        .and(get())
        .and(query::<FormatParams>())
        .and(with_wallets(wm))
        .then(handlers::balance)
        .map(respond)
}

fn events(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "events")
        .and(get())
        .and(query::<PageParams>())
        .and(with_wallets(wm))
        .then(handlers::events)
        .map(respond)
}

fn pool(
    cm: ChainRef,
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "txpool")
        .and(get())
        .and(with_chain(cm))
        .and(with_wallets(wm))
        .then(handlers::pool)
        .map(respond)
}

fn outputs_siacoin(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "outputs" / "siacoin")
        .and(get())
        .and(query::<PageParams>())
        .and(with_wallets(wm))
        .then(handlers::outputs_siacoin)
        .map(respond)
}

fn outputs_siafund(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "outputs" / "siafund")
        .and(get())
        .and(query::<PageParams>())
        .and(with_wallets(wm))
        .then(handlers::outputs_siafund)
        .map(respond)
}

fn reserve(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "reserve")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::reserve)
        .map(respond)
}

fn release(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "release")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::release)
        .map(respond)
}

fn fund(wm: WalletsRef) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "fund")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::fund)
        .map(respond)
}

fn fund_siafund(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("wallets" / WalletID / "fundsf")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::fund_siafund)
        .map(respond)
}

fn resubscribe(
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("resubscribe")
        .and(post())
        .and(body::json())
        .and(with_wallets(wm))
        .then(handlers::resubscribe)
        .map(respond)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chain::{Address, Block, Currency, Network, SiacoinOutput, Transaction};
    use wallet::{MemStore, Wallet, WalletManager};

    use super::*;

    fn test_setup() -> (ChainRef, WalletsRef) {
        let network = Network {
            name: "test".into(),
            maturity_delay: 3,
            foundation_address: Address::VOID,
            foundation_subsidy: Currency::ZERO,
        };
        let genesis = Block {
            timestamp_ms: 1,
            ..Block::default()
        };
        let cm = Arc::new(chain::Manager::new(network, genesis).unwrap());
        let wm = Arc::new(WalletManager::new(MemStore::new(), cm.clone()).unwrap());
        (cm, wm)
    }

    fn addr(n: u8) -> Address {
        Address([n; 32])
    }

    /// Mines one block carrying the given transactions and indexes it.
    fn mine(cm: &ChainRef, wm: &WalletsRef, transactions: Vec<Transaction>) {
        let tip = cm.tip();
        cm.add_blocks(&[Block {
            parent_id: tip.id,
            timestamp_ms: (tip.height + 2) * 1000,
            transactions,
            ..Block::default()
        }])
        .unwrap();
        wm.sync().unwrap();
    }

    #[tokio::test]
    async fn wallet_crud_over_http() {
        let (cm, wm) = test_setup();
        let routes = routes(cm, wm);

        let resp = warp::test::request()
            .method("POST")
            .path("/wallets")
            .json(&serde_json::json!({"name": "primary", "metadata": {"k": 1}}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let created: Wallet = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(created.name, "primary");

        let resp = warp::test::request()
            .method("GET")
            .path("/wallets")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let wallets: Vec<Wallet> = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(wallets.len(), 1);

        // unknown wallets are a 404
        let resp = warp::test::request()
            .method("GET")
            .path("/wallets/0000000000000000000000000000ffff/balance")
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn balance_reads_and_prometheus_rendering() {
        let (cm, wm) = test_setup();
        let routes = routes(cm.clone(), wm.clone());

        let created = wm.add_wallet(Wallet::default()).unwrap();
        wm.add_address(
            created.id,
            wallet::WalletAddress {
                address: addr(1),
                spend_policy: None,
                metadata: serde_json::Value::Null,
            },
        )
        .unwrap();
        mine(
            &cm,
            &wm,
            vec![Transaction {
                siacoin_outputs: vec![SiacoinOutput {
                    value: Currency::from(75),
                    address: addr(1),
                }],
                ..Transaction::default()
            }],
        );

        let path = format!("/wallets/{}/balance", created.id);
        let resp = warp::test::request().path(&path).reply(&routes).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["siacoins"], "75");

        let resp = warp::test::request()
            .path(&format!("{path}?response=prometheus"))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let text = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(text.contains("utxod_wallet_balance_siacoins"));
    }

    #[tokio::test]
    async fn reserve_conflicts_map_to_409() {
        let (cm, wm) = test_setup();
        let routes = routes(cm, wm.clone());
        let created = wm.add_wallet(Wallet::default()).unwrap();

        let body = serde_json::json!({
            "siacoinOutputs": ["11".repeat(32)],
            "duration": 60_000,
        });
        let path = format!("/wallets/{}/reserve", created.id);
        let resp = warp::test::request()
            .method("POST")
            .path(&path)
            .json(&body)
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);

        let resp = warp::test::request()
            .method("POST")
            .path(&path)
            .json(&body)
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 409);

        let resp = warp::test::request()
            .method("POST")
            .path(&format!("/wallets/{}/release", created.id))
            .json(&serde_json::json!({"siacoinOutputs": ["11".repeat(32)]}))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn funding_over_http() {
        let (cm, wm) = test_setup();
        let routes = routes(cm.clone(), wm.clone());
        let created = wm.add_wallet(Wallet::default()).unwrap();
        wm.add_address(
            created.id,
            wallet::WalletAddress {
                address: addr(1),
                spend_policy: None,
                metadata: serde_json::Value::Null,
            },
        )
        .unwrap();
        mine(
            &cm,
            &wm,
            vec![Transaction {
                siacoin_outputs: vec![SiacoinOutput {
                    value: Currency::from(100),
                    address: addr(1),
                }],
                ..Transaction::default()
            }],
        );

        let path = format!("/wallets/{}/fund", created.id);
        let resp = warp::test::request()
            .method("POST")
            .path(&path)
            .json(&serde_json::json!({
                "transaction": {},
                "amount": "40",
                "changeAddress": "22".repeat(32),
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let funded: wallet::FundResult = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(funded.to_sign.len(), 1);
        assert_eq!(funded.transaction.siacoin_outputs.len(), 1);
        assert_eq!(
            funded.transaction.siacoin_outputs[0].value,
            Currency::from(60)
        );

        // the only output is now reserved
        let resp = warp::test::request()
            .method("POST")
            .path(&path)
            .json(&serde_json::json!({
                "transaction": {},
                "amount": "40",
                "changeAddress": "22".repeat(32),
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 400);
    }
}
