use crate::{
    account::Account,
    app::account_storage::AccountStorage,
};
use std::sync::{
    Arc,
    Mutex,
};

#[derive(Clone, Default)]
pub struct InMemoryAccountStorage {
    account: Arc<Mutex<Option<Account>>>,
}

impl InMemoryAccountStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_account(account: Account) -> Self {
        Self {
            account: Arc::new(Mutex::new(Some(account))),
        }
    }

    pub fn account(&self) -> Arc<Mutex<Option<Account>>> {
        self.account.clone()
    }
}

impl AccountStorage for InMemoryAccountStorage {
    fn load_account(&self) -> crate::Result<Option<Account>> {
        let guard = self
            .account
            .lock()
            .map_err(|_| anyhow::anyhow!("in-memory account lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save_account(&mut self, account: &Account) -> crate::Result<()> {
        let mut guard = self
            .account
            .lock()
            .map_err(|_| anyhow::anyhow!("in-memory account lock poisoned"))?;
        *guard = Some(account.clone());
        Ok(())
    }
}
