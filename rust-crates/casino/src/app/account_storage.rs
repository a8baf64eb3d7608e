use crate::account::Account;

pub trait AccountStorage {
    /// retrieve the account, or `None` if it has not been created yet
    fn load_account(&self) -> crate::Result<Option<Account>>;

    /// write or overwrite the account. Balance and history are written together
    fn save_account(&mut self, account: &Account) -> crate::Result<()>;
}
