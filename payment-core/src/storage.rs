//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `payments` - Payment aggregates (key: payment_id)
//! - `instruments` - Funding instruments (key: instrument_id)
//! - `attempts` - Append-only attempt log (key: payment_id || number)
//! - `events` - Append-only event timeline (key: payment_id || seq)
//! - `refunds` - Refunds (key: refund_id)
//! - `indices` - Secondary indices (status -> payment, payment -> refund)
//! - `processed` - Consumed gateway message ids (idempotent delivery)
//!
//! Every mutation commits through a single `WriteBatch`, so a status
//! change, its attempt record, its timeline events and the instrument
//! balance move together or not at all. Attempt numbers and event
//! sequence numbers are `count(existing) + 1`, computed under the
//! single-writer's serialization.

use crate::{
    error::{Error, Result},
    types::{Attempt, FundingInstrument, Payment, PaymentEvent, PaymentStatus, Refund},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, IteratorMode, Options, WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_PAYMENTS: &str = "payments";
const CF_INSTRUMENTS: &str = "instruments";
const CF_ATTEMPTS: &str = "attempts";
const CF_EVENTS: &str = "events";
const CF_REFUNDS: &str = "refunds";
const CF_INDICES: &str = "indices";
const CF_PROCESSED: &str = "processed";

/// Index key prefixes within CF_INDICES
const IDX_STATUS: u8 = b's';
const IDX_REFUND: u8 = b'r';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for the append-heavy audit logs
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_PAYMENTS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_INSTRUMENTS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_ATTEMPTS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_REFUNDS, Self::cf_options_hot()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_PROCESSED, Self::cf_options_log()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_hot() -> Options {
        let mut opts = Options::default();
        // Frequently read aggregates, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key helpers

    fn seq_key(id: &Uuid, seq: u32) -> [u8; 20] {
        let mut key = [0u8; 20];
        key[..16].copy_from_slice(id.as_bytes());
        key[16..].copy_from_slice(&seq.to_be_bytes());
        key
    }

    fn status_index_key(status: PaymentStatus, payment_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_STATUS, status as u8];
        key.extend_from_slice(payment_id.as_bytes());
        key
    }

    fn refund_index_key(payment_id: &Uuid, refund_id: &Uuid) -> Vec<u8> {
        let mut key = vec![IDX_REFUND];
        key.extend_from_slice(payment_id.as_bytes());
        key.extend_from_slice(refund_id.as_bytes());
        key
    }

    /// Scan a column family for values whose key starts with `prefix`
    fn scan_prefix<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<T>> {
        let cf = self.cf_handle(cf_name)?;
        let iter = self.db.prefix_iterator_cf(cf, prefix);

        let mut items = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            items.push(bincode::deserialize(&value)?);
        }

        Ok(items)
    }

    fn count_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<u32> {
        let cf = self.cf_handle(cf_name)?;
        let iter = self.db.prefix_iterator_cf(cf, prefix);

        let mut count = 0u32;
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    // Batch building blocks (used by the atomic composites below)

    fn put_payment_in(&self, batch: &mut WriteBatch, payment: &Payment) -> Result<()> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        batch.put_cf(cf, payment.id.as_bytes(), bincode::serialize(payment)?);
        Ok(())
    }

    fn move_status_index_in(
        &self,
        batch: &mut WriteBatch,
        payment: &Payment,
        previous: Option<PaymentStatus>,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_INDICES)?;
        if let Some(prev) = previous {
            if prev != payment.status {
                batch.delete_cf(cf, Self::status_index_key(prev, &payment.id));
            }
        }
        batch.put_cf(cf, Self::status_index_key(payment.status, &payment.id), b"");
        Ok(())
    }

    fn append_events_in(
        &self,
        batch: &mut WriteBatch,
        payment_id: &Uuid,
        events: &[PaymentEvent],
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let cf = self.cf_handle(CF_EVENTS)?;
        let base = self.event_count(*payment_id)?;
        for (i, event) in events.iter().enumerate() {
            let key = Self::seq_key(payment_id, base + i as u32 + 1);
            batch.put_cf(cf, key, bincode::serialize(event)?);
        }
        Ok(())
    }

    fn put_attempt_in(&self, batch: &mut WriteBatch, attempt: &Attempt) -> Result<()> {
        let cf = self.cf_handle(CF_ATTEMPTS)?;
        let key = Self::seq_key(&attempt.payment_id, attempt.number);
        batch.put_cf(cf, key, bincode::serialize(attempt)?);
        Ok(())
    }

    fn put_instrument_in(&self, batch: &mut WriteBatch, instrument: &FundingInstrument) -> Result<()> {
        let cf = self.cf_handle(CF_INSTRUMENTS)?;
        batch.put_cf(cf, instrument.id.as_bytes(), bincode::serialize(instrument)?);
        Ok(())
    }

    fn put_refund_in(&self, batch: &mut WriteBatch, refund: &Refund) -> Result<()> {
        let cf_refunds = self.cf_handle(CF_REFUNDS)?;
        batch.put_cf(cf_refunds, refund.id.as_bytes(), bincode::serialize(refund)?);
        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            cf_indices,
            Self::refund_index_key(&refund.payment_id, &refund.id),
            b"",
        );
        Ok(())
    }

    // Atomic composites

    /// Persist a new payment with its creation events
    pub fn create_payment_atomic(&self, payment: &Payment, events: &[PaymentEvent]) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_payment_in(&mut batch, payment)?;
        self.move_status_index_in(&mut batch, payment, None)?;
        self.append_events_in(&mut batch, &payment.id, events)?;
        self.db.write(batch)?;

        tracing::debug!(payment_id = %payment.id, "Payment created");
        Ok(())
    }

    /// Persist a payment update (status change or field update) with events
    pub fn update_payment_atomic(
        &self,
        payment: &Payment,
        previous: PaymentStatus,
        events: &[PaymentEvent],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_payment_in(&mut batch, payment)?;
        self.move_status_index_in(&mut batch, payment, Some(previous))?;
        self.append_events_in(&mut batch, &payment.id, events)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Persist an authorization outcome in one atomic commit
    ///
    /// Covers the payment update, the conditional instrument mutation (when
    /// one applied), the attempt record and the timeline events. This is the
    /// commit point of the funds-movement primitive: either all of it lands
    /// or none of it does.
    pub fn authorize_atomic(
        &self,
        payment: &Payment,
        previous: PaymentStatus,
        instrument: Option<&FundingInstrument>,
        attempt: &Attempt,
        events: &[PaymentEvent],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_payment_in(&mut batch, payment)?;
        self.move_status_index_in(&mut batch, payment, Some(previous))?;
        if let Some(instrument) = instrument {
            self.put_instrument_in(&mut batch, instrument)?;
        }
        self.put_attempt_in(&mut batch, attempt)?;
        self.append_events_in(&mut batch, &payment.id, events)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Persist a refund state change in one atomic commit
    ///
    /// Covers the refund record, an optional payment transition (payment is
    /// `None` when only the refund changes), the optional instrument credit
    /// and the timeline events.
    pub fn refund_atomic(
        &self,
        refund: &Refund,
        payment: Option<(&Payment, PaymentStatus)>,
        instrument: Option<&FundingInstrument>,
        events: &[PaymentEvent],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_refund_in(&mut batch, refund)?;
        if let Some((payment, previous)) = payment {
            self.put_payment_in(&mut batch, payment)?;
            self.move_status_index_in(&mut batch, payment, Some(previous))?;
        }
        if let Some(instrument) = instrument {
            self.put_instrument_in(&mut batch, instrument)?;
        }
        self.append_events_in(&mut batch, &refund.payment_id, events)?;
        self.db.write(batch)?;
        Ok(())
    }

    /// Persist a funding instrument
    pub fn put_instrument(&self, instrument: &FundingInstrument) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.put_instrument_in(&mut batch, instrument)?;
        self.db.write(batch)?;
        Ok(())
    }

    // Reads

    /// Get payment by ID
    pub fn get_payment(&self, payment_id: Uuid) -> Result<Payment> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let value = self
            .db
            .get_cf(cf, payment_id.as_bytes())?
            .ok_or_else(|| Error::PaymentNotFound(payment_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Get instrument by ID
    pub fn get_instrument(&self, instrument_id: Uuid) -> Result<FundingInstrument> {
        let cf = self.cf_handle(CF_INSTRUMENTS)?;
        let value = self
            .db
            .get_cf(cf, instrument_id.as_bytes())?
            .ok_or_else(|| Error::InstrumentNotFound(instrument_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Get refund by ID
    pub fn get_refund(&self, refund_id: Uuid) -> Result<Refund> {
        let cf = self.cf_handle(CF_REFUNDS)?;
        let value = self
            .db
            .get_cf(cf, refund_id.as_bytes())?
            .ok_or_else(|| Error::RefundNotFound(refund_id.to_string()))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// List payments currently in `status` (via the status index)
    pub fn payments_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let prefix = [IDX_STATUS, status as u8];
        let iter = self.db.prefix_iterator_cf(cf, prefix);

        let mut payments = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if key.len() == 2 + 16 {
                let id_bytes: [u8; 16] = key[2..18].try_into().unwrap();
                payments.push(self.get_payment(Uuid::from_bytes(id_bytes))?);
            }
        }

        Ok(payments)
    }

    /// Attempts for a payment, in attempt-number order
    pub fn attempts_for(&self, payment_id: Uuid) -> Result<Vec<Attempt>> {
        self.scan_prefix(CF_ATTEMPTS, payment_id.as_bytes())
    }

    /// Number of attempts recorded for a payment
    pub fn attempt_count(&self, payment_id: Uuid) -> Result<u32> {
        self.count_prefix(CF_ATTEMPTS, payment_id.as_bytes())
    }

    /// Latest attempt for a payment, if any
    pub fn latest_attempt(&self, payment_id: Uuid) -> Result<Option<Attempt>> {
        Ok(self.attempts_for(payment_id)?.pop())
    }

    /// Events for a payment in chronological (insertion) order
    pub fn events_for(&self, payment_id: Uuid) -> Result<Vec<PaymentEvent>> {
        self.scan_prefix(CF_EVENTS, payment_id.as_bytes())
    }

    /// Number of events recorded for a payment
    pub fn event_count(&self, payment_id: Uuid) -> Result<u32> {
        self.count_prefix(CF_EVENTS, payment_id.as_bytes())
    }

    /// Refunds recorded against a payment
    pub fn refunds_for(&self, payment_id: Uuid) -> Result<Vec<Refund>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let mut prefix = vec![IDX_REFUND];
        prefix.extend_from_slice(payment_id.as_bytes());
        let iter = self.db.prefix_iterator_cf(cf, &prefix);

        let mut refunds = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix.as_slice()) {
                break;
            }
            if key.len() == 1 + 16 + 16 {
                let id_bytes: [u8; 16] = key[17..33].try_into().unwrap();
                refunds.push(self.get_refund(Uuid::from_bytes(id_bytes))?);
            }
        }

        Ok(refunds)
    }

    /// Record a gateway message id; returns false when already seen
    ///
    /// Duplicate deliveries of the same envelope are skipped by callers when
    /// this returns false.
    pub fn mark_processed(&self, message_id: Uuid) -> Result<bool> {
        let cf = self.cf_handle(CF_PROCESSED)?;
        if self.db.get_cf(cf, message_id.as_bytes())?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, message_id.as_bytes(), b"")?;
        Ok(true)
    }

    /// Get storage statistics (approximate, fast)
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            total_payments: self.approximate_count(CF_PAYMENTS)?,
            total_attempts: self.approximate_count(CF_ATTEMPTS)?,
            total_events: self.approximate_count(CF_EVENTS)?,
            total_refunds: self.approximate_count(CF_REFUNDS)?,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate payment count
    pub total_payments: u64,
    /// Approximate attempt count
    pub total_attempts: u64,
    /// Approximate event count
    pub total_events: u64,
    /// Approximate refund count
    pub total_refunds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AttemptStatus, Currency, EventActor, EventType, InstrumentKind, PaymentDraft,
    };
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_payment() -> Payment {
        Payment::from_draft(PaymentDraft {
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            request_id: None,
            subtotal: dec!(100.00),
            taxes: dec!(10.00),
            fees: dec!(5.00),
            currency: Currency::USD,
            metadata: HashMap::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_PAYMENTS).is_some());
        assert!(storage.db.cf_handle(CF_EVENTS).is_some());
        assert!(storage.db.cf_handle(CF_PROCESSED).is_some());
    }

    #[test]
    fn test_payment_roundtrip_with_status_index() {
        let (storage, _temp) = test_storage();
        let payment = test_payment();

        storage.create_payment_atomic(&payment, &[]).unwrap();

        let retrieved = storage.get_payment(payment.id).unwrap();
        assert_eq!(retrieved.id, payment.id);
        assert_eq!(retrieved.total, dec!(115.00));

        let pending = storage
            .payments_by_status(PaymentStatus::PendingPayment)
            .unwrap();
        assert_eq!(pending.len(), 1);

        // Transition moves the index entry
        let mut updated = payment.clone();
        updated
            .transition(PaymentStatus::Approved, chrono::Utc::now())
            .unwrap();
        storage
            .update_payment_atomic(&updated, PaymentStatus::PendingPayment, &[])
            .unwrap();

        assert!(storage
            .payments_by_status(PaymentStatus::PendingPayment)
            .unwrap()
            .is_empty());
        assert_eq!(
            storage
                .payments_by_status(PaymentStatus::Approved)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_unknown_payment_is_not_found() {
        let (storage, _temp) = test_storage();
        let err = storage.get_payment(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::PaymentNotFound(_)));
    }

    #[test]
    fn test_attempt_log_ordering() {
        let (storage, _temp) = test_storage();
        let payment = test_payment();
        storage.create_payment_atomic(&payment, &[]).unwrap();

        for n in 1..=3u32 {
            let next = storage.attempt_count(payment.id).unwrap() + 1;
            assert_eq!(next, n);
            let attempt = Attempt::new(payment.id, next, AttemptStatus::Rejected);
            let mut batch = WriteBatch::default();
            storage.put_attempt_in(&mut batch, &attempt).unwrap();
            storage.db.write(batch).unwrap();
        }

        let attempts = storage.attempts_for(payment.id).unwrap();
        let numbers: Vec<u32> = attempts.iter().map(|a| a.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(storage.latest_attempt(payment.id).unwrap().unwrap().number, 3);
    }

    #[test]
    fn test_event_timeline_insertion_order() {
        let (storage, _temp) = test_storage();
        let payment = test_payment();

        let events: Vec<PaymentEvent> = [
            EventType::PaymentCreated,
            EventType::InstrumentSelected,
            EventType::AuthorizationSucceeded,
        ]
        .iter()
        .map(|t| PaymentEvent::new(payment.id, *t, EventActor::System))
        .collect();

        storage.create_payment_atomic(&payment, &events[..1]).unwrap();
        storage
            .update_payment_atomic(&payment, payment.status, &events[1..])
            .unwrap();

        let timeline = storage.events_for(payment.id).unwrap();
        let types: Vec<EventType> = timeline.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::PaymentCreated,
                EventType::InstrumentSelected,
                EventType::AuthorizationSucceeded,
            ]
        );

        // Reading twice without writes yields identical results
        let again = storage.events_for(payment.id).unwrap();
        assert_eq!(
            timeline.iter().map(|e| e.id).collect::<Vec<_>>(),
            again.iter().map(|e| e.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_instrument_roundtrip() {
        let (storage, _temp) = test_storage();
        let instrument =
            FundingInstrument::new(InstrumentKind::Wallet, Currency::USD, dec!(200.00));
        storage.put_instrument(&instrument).unwrap();

        let retrieved = storage.get_instrument(instrument.id).unwrap();
        assert_eq!(retrieved.balance, dec!(200.00));
        assert_eq!(retrieved.kind, InstrumentKind::Wallet);
    }

    #[test]
    fn test_refund_index() {
        let (storage, _temp) = test_storage();
        let payment = test_payment();
        storage.create_payment_atomic(&payment, &[]).unwrap();

        let refund = Refund::new(payment.id, dec!(40.00), "damaged".to_string(), Uuid::new_v4());
        storage.refund_atomic(&refund, None, None, &[]).unwrap();

        let refunds = storage.refunds_for(payment.id).unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, dec!(40.00));

        let by_id = storage.get_refund(refund.id).unwrap();
        assert_eq!(by_id.payment_id, payment.id);
    }

    #[test]
    fn test_mark_processed_dedup() {
        let (storage, _temp) = test_storage();
        let message_id = Uuid::new_v4();

        assert!(storage.mark_processed(message_id).unwrap());
        assert!(!storage.mark_processed(message_id).unwrap());
    }
}
