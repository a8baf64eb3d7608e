#![allow(non_snake_case)]

use casino::{
    account::Account,
    test_helpers::spawn_test_casino,
};
use proptest::prelude::*;
use serde_json::{
    Value,
    json,
};

async fn play(bets: &[(i64, i64)], rolls: Vec<u8>) -> (Vec<(u16, Value)>, Account) {
    let casino = spawn_test_casino(Some(Account::default()), rolls).await;
    let http = reqwest::Client::new();
    let mut replies = Vec::new();
    for (amount, number) in bets {
        let res = http
            .post(format!("{}/api/bet", casino.base_url()))
            .json(&json!({"amount": amount, "number": number}))
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        replies.push((status, res.json().await.unwrap()));
    }
    let account = casino.account().unwrap();
    (replies, account)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn bets_over_http__balance_matches_history(
        bets in prop::collection::vec((-50i64..1500, 0i64..8), 1..12),
        rolls in prop::collection::vec(1u8..=6, 1..6),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (replies, account) = runtime.block_on(play(&bets, rolls));

        let accepted = replies.iter().filter(|(status, _)| *status == 200).count();
        prop_assert_eq!(account.history.len(), accepted);
        prop_assert!(replies.iter().all(|(status, _)| *status == 200 || *status == 400));

        let mut expected: u64 = 1000;
        for record in &account.history {
            prop_assert!(record.amount > 0 && record.amount <= expected);
            expected = if record.outcome.is_win() {
                expected + 5 * record.amount
            } else {
                expected - record.amount
            };
        }
        prop_assert_eq!(account.balance, expected);

        let last_balance = replies
            .iter()
            .rev()
            .find(|(status, _)| *status == 200)
            .map(|(_, body)| body["balance"].as_u64().unwrap());
        if let Some(last_balance) = last_balance {
            prop_assert_eq!(last_balance, account.balance);
        }
    }
}
