// Sled-backed account persistence.
use crate::{
    account::{
        Account,
        BetRecord,
    },
    app::account_storage::AccountStorage,
};
use anyhow::Context;
use serde::de::DeserializeOwned;
use sled::{
    Batch,
    Config,
    Db,
    Tree,
};
use std::{
    convert::TryInto,
    path::Path,
};

const ACCOUNT_TREE: &str = "account";
const BALANCE_KEY: &[u8] = b"balance";
const HISTORY_KEY: &[u8] = b"history";

/// Keeps the account as one record: an integer balance next to a JSON list of bets.
#[derive(Clone)]
pub struct SledAccountStorage {
    tree: Tree,
}

impl SledAccountStorage {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let tree = db
            .open_tree(ACCOUNT_TREE)
            .context("open account tree")?;
        Ok(Self { tree })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config = Config::default().path(path);
        let db = config.open().context("open sled database")?;
        Self::new(&db)
    }

    fn balance(&self) -> crate::Result<Option<u64>> {
        match self.tree.get(BALANCE_KEY).context("read account balance")? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .context("account balance should be 8 bytes")?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn history(&self) -> crate::Result<Vec<BetRecord>> {
        match self.tree.get(HISTORY_KEY).context("read account history")? {
            Some(bytes) => deserialize(bytes.as_ref()),
            None => Ok(Vec::new()),
        }
    }
}

impl AccountStorage for SledAccountStorage {
    fn load_account(&self) -> crate::Result<Option<Account>> {
        let Some(balance) = self.balance()? else {
            return Ok(None);
        };
        let history = self.history()?;
        Ok(Some(Account { balance, history }))
    }

    fn save_account(&mut self, account: &Account) -> crate::Result<()> {
        let history =
            serde_json::to_vec(&account.history).context("serialize account history")?;
        let mut batch = Batch::default();
        batch.insert(BALANCE_KEY, account.balance.to_be_bytes().as_slice());
        batch.insert(HISTORY_KEY, history);
        self.tree
            .apply_batch(batch)
            .context("persist account record")?;
        self.tree.flush().context("flush account record")?;
        Ok(())
    }
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(bytes).context("deserialize sled record")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::SledAccountStorage;
    use crate::{
        account::{
            Account,
            BetRecord,
            Outcome,
        },
        app::account_storage::AccountStorage,
        engine::GameEngine,
        test_helpers::ScriptedDie,
    };
    use chrono::Utc;
    use tempdir::TempDir;

    fn sled_db(temp_dir: &TempDir) -> sled::Db {
        sled::Config::default()
            .path(temp_dir.path())
            .open()
            .expect("open sled db")
    }

    fn arb_account() -> Account {
        let mut account = Account::with_balance(1_340);
        account.history.push(BetRecord {
            amount: 60,
            chosen_number: 2,
            rolled_number: 2,
            outcome: Outcome::Win,
            placed_at: Utc::now(),
        });
        account.history.push(BetRecord {
            amount: 20,
            chosen_number: 5,
            rolled_number: 1,
            outcome: Outcome::Lose,
            placed_at: Utc::now(),
        });
        account
    }

    #[test]
    fn load_account__fresh_database__returns_none() {
        let temp_dir = TempDir::new("sled_account_fresh").unwrap();
        let db = sled_db(&temp_dir);

        let storage = SledAccountStorage::new(&db).unwrap();

        assert!(storage.load_account().unwrap().is_none());
    }

    #[test]
    fn sut__when_saving_account_then_balance_and_history_are_persisted() {
        // given
        let temp_dir = TempDir::new("sled_account_save").unwrap();
        let db = sled_db(&temp_dir);
        let mut storage = SledAccountStorage::new(&db).unwrap();
        let account = arb_account();

        // when
        storage.save_account(&account).unwrap();

        // then
        let loaded = storage.load_account().unwrap().expect("account exists");
        assert_eq!(loaded, account);
    }

    #[test]
    fn sut__when_overwriting_account_then_latest_record_wins() {
        // given
        let temp_dir = TempDir::new("sled_account_overwrite").unwrap();
        let db = sled_db(&temp_dir);
        let mut storage = SledAccountStorage::new(&db).unwrap();
        storage.save_account(&arb_account()).unwrap();

        // when
        storage.save_account(&Account::default()).unwrap();

        // then
        let loaded = storage.load_account().unwrap().expect("account exists");
        assert_eq!(loaded, Account::default());
    }

    #[test]
    fn sut__when_reopening_database_then_account_survives() {
        // given
        let temp_dir = TempDir::new("sled_account_reopen").unwrap();
        let account = arb_account();
        {
            let mut storage = SledAccountStorage::open(temp_dir.path()).unwrap();
            storage.save_account(&account).unwrap();
        }

        // when
        let storage = SledAccountStorage::open(temp_dir.path()).unwrap();

        // then
        assert_eq!(storage.load_account().unwrap(), Some(account));
    }

    #[test]
    fn sut__history_is_stored_as_json_list_with_client_field_names() {
        // given
        let temp_dir = TempDir::new("sled_account_layout").unwrap();
        let db = sled_db(&temp_dir);
        let mut storage = SledAccountStorage::new(&db).unwrap();

        // when
        storage.save_account(&arb_account()).unwrap();

        // then
        let tree = db.open_tree("account").unwrap();
        let raw = tree.get(b"history").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json[0]["diceRoll"], 2);
        assert_eq!(json[1]["result"], "lose");
        let balance = tree.get(b"balance").unwrap().unwrap();
        assert_eq!(balance.as_ref(), 1_340u64.to_be_bytes().as_slice());
    }

    #[test]
    fn load_account__truncated_balance__is_error() {
        // given
        let temp_dir = TempDir::new("sled_account_truncated").unwrap();
        let db = sled_db(&temp_dir);
        db.open_tree("account")
            .unwrap()
            .insert(b"balance", &[0u8, 1, 2][..])
            .unwrap();

        // when
        let storage = SledAccountStorage::new(&db).unwrap();

        // then
        assert!(storage.load_account().is_err());
    }

    #[test]
    fn bootstrap__corrupt_balance__fails_and_keeps_the_record() {
        // given
        let temp_dir = TempDir::new("sled_account_corrupt").unwrap();
        let db = sled_db(&temp_dir);
        let tree = db.open_tree("account").unwrap();
        tree.insert(b"balance", &b"lots"[..]).unwrap();
        let storage = SledAccountStorage::new(&db).unwrap();

        // when
        let result = GameEngine::bootstrap(storage, ScriptedDie::new([1]));

        // then
        assert!(result.is_err());
        assert_eq!(tree.get(b"balance").unwrap().unwrap().as_ref(), b"lots");
        assert!(tree.get(b"history").unwrap().is_none());
    }
}
