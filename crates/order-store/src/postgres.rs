use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio::time::timeout;

use crate::{
    Delivery, Item, OrderHeader, OrderRecord, OrderUid, Payment, Result, StoreError,
    store::{OrderStore, validate_record},
};

/// PostgreSQL-backed order store.
///
/// Each logical operation acquires a connection from the pool for the
/// duration of its (possibly multi-statement) transaction and is
/// bounded by `op_timeout`; exceeding it surfaces as
/// [`StoreError::Timeout`], never a hang.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_header(row: &PgRow) -> Result<OrderHeader> {
        Ok(OrderHeader {
            order_uid: OrderUid::new(row.try_get::<String, _>("order_uid")?),
            track_number: row.try_get("track_number")?,
            entry: row.try_get("entry")?,
            locale: row.try_get("locale")?,
            internal_signature: row.try_get("internal_signature")?,
            customer_id: row.try_get("customer_id")?,
            delivery_service: row.try_get("delivery_service")?,
            shardkey: row.try_get("shardkey")?,
            sm_id: row.try_get("sm_id")?,
            date_created: row.try_get("date_created")?,
            oof_shard: row.try_get("oof_shard")?,
        })
    }

    fn row_to_delivery(row: &PgRow) -> Result<Delivery> {
        Ok(Delivery {
            order_uid: OrderUid::new(row.try_get::<String, _>("order_uid")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            zip: row.try_get("zip")?,
            city: row.try_get("city")?,
            address: row.try_get("address")?,
            region: row.try_get("region")?,
            email: row.try_get("email")?,
        })
    }

    fn row_to_payment(row: &PgRow) -> Result<Payment> {
        Ok(Payment {
            order_uid: OrderUid::new(row.try_get::<String, _>("order_uid")?),
            transaction: row.try_get("transaction")?,
            request_id: row.try_get("request_id")?,
            currency: row.try_get("currency")?,
            provider: row.try_get("provider")?,
            amount: row.try_get("amount")?,
            payment_dt: row.try_get("payment_dt")?,
            bank: row.try_get("bank")?,
            delivery_cost: row.try_get("delivery_cost")?,
            goods_total: row.try_get("goods_total")?,
            custom_fee: row.try_get("custom_fee")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<Item> {
        Ok(Item {
            order_uid: OrderUid::new(row.try_get::<String, _>("order_uid")?),
            chrt_id: row.try_get("chrt_id")?,
            track_number: row.try_get("track_number")?,
            price: row.try_get("price")?,
            rid: row.try_get("rid")?,
            name: row.try_get("name")?,
            sale: row.try_get("sale")?,
            size: row.try_get("size")?,
            total_price: row.try_get("total_price")?,
            nm_id: row.try_get("nm_id")?,
            brand: row.try_get("brand")?,
            status: row.try_get("status")?,
        })
    }

    async fn get_order_inner(&self, order_uid: &OrderUid) -> Result<OrderRecord> {
        let header_row = sqlx::query(
            r#"
            SELECT order_uid, track_number, entry, locale, internal_signature, customer_id,
                   delivery_service, shardkey, sm_id, date_created, oof_shard
            FROM orders WHERE order_uid = $1
            "#,
        )
        .bind(order_uid.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;

        let delivery_row = sqlx::query(
            r#"
            SELECT order_uid, name, phone, zip, city, address, region, email
            FROM delivery WHERE order_uid = $1
            "#,
        )
        .bind(order_uid.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;

        let payment_row = sqlx::query(
            r#"
            SELECT order_uid, transaction, request_id, currency, provider, amount,
                   payment_dt, bank, delivery_cost, goods_total, custom_fee
            FROM payment WHERE order_uid = $1
            "#,
        )
        .bind(order_uid.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_uid.clone()))?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_uid, chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM items WHERE order_uid = $1
            ORDER BY chrt_id ASC
            "#,
        )
        .bind(order_uid.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(OrderRecord {
            order: Self::row_to_header(&header_row)?,
            delivery: Self::row_to_delivery(&delivery_row)?,
            payment: Self::row_to_payment(&payment_row)?,
            items: item_rows
                .iter()
                .map(Self::row_to_item)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    async fn put_order_inner(&self, record: &OrderRecord) -> Result<()> {
        validate_record(record).map_err(StoreError::InvalidRecord)?;

        let mut tx = self.pool.begin().await?;

        // Statement order (header, delivery, payment, items) is kept
        // stable so failures are attributable from the logs.
        sqlx::query(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO UPDATE SET
                track_number = EXCLUDED.track_number,
                entry = EXCLUDED.entry,
                locale = EXCLUDED.locale,
                internal_signature = EXCLUDED.internal_signature,
                customer_id = EXCLUDED.customer_id,
                delivery_service = EXCLUDED.delivery_service,
                shardkey = EXCLUDED.shardkey,
                sm_id = EXCLUDED.sm_id,
                date_created = EXCLUDED.date_created,
                oof_shard = EXCLUDED.oof_shard
            "#,
        )
        .bind(record.order.order_uid.as_str())
        .bind(&record.order.track_number)
        .bind(&record.order.entry)
        .bind(&record.order.locale)
        .bind(&record.order.internal_signature)
        .bind(&record.order.customer_id)
        .bind(&record.order.delivery_service)
        .bind(&record.order.shardkey)
        .bind(record.order.sm_id)
        .bind(record.order.date_created)
        .bind(&record.order.oof_shard)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO delivery (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (order_uid) DO UPDATE SET
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                zip = EXCLUDED.zip,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                region = EXCLUDED.region,
                email = EXCLUDED.email
            "#,
        )
        .bind(record.delivery.order_uid.as_str())
        .bind(&record.delivery.name)
        .bind(&record.delivery.phone)
        .bind(&record.delivery.zip)
        .bind(&record.delivery.city)
        .bind(&record.delivery.address)
        .bind(&record.delivery.region)
        .bind(&record.delivery.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payment (order_uid, transaction, request_id, currency, provider,
                amount, payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO UPDATE SET
                transaction = EXCLUDED.transaction,
                request_id = EXCLUDED.request_id,
                currency = EXCLUDED.currency,
                provider = EXCLUDED.provider,
                amount = EXCLUDED.amount,
                payment_dt = EXCLUDED.payment_dt,
                bank = EXCLUDED.bank,
                delivery_cost = EXCLUDED.delivery_cost,
                goods_total = EXCLUDED.goods_total,
                custom_fee = EXCLUDED.custom_fee
            "#,
        )
        .bind(record.payment.order_uid.as_str())
        .bind(&record.payment.transaction)
        .bind(&record.payment.request_id)
        .bind(&record.payment.currency)
        .bind(&record.payment.provider)
        .bind(record.payment.amount)
        .bind(record.payment.payment_dt)
        .bind(&record.payment.bank)
        .bind(record.payment.delivery_cost)
        .bind(record.payment.goods_total)
        .bind(record.payment.custom_fee)
        .execute(&mut *tx)
        .await?;

        for item in &record.items {
            sqlx::query(
                r#"
                INSERT INTO items (order_uid, chrt_id, track_number, price, rid, name,
                    sale, size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (order_uid, chrt_id) DO UPDATE SET
                    track_number = EXCLUDED.track_number,
                    price = EXCLUDED.price,
                    rid = EXCLUDED.rid,
                    name = EXCLUDED.name,
                    sale = EXCLUDED.sale,
                    size = EXCLUDED.size,
                    total_price = EXCLUDED.total_price,
                    nm_id = EXCLUDED.nm_id,
                    brand = EXCLUDED.brand,
                    status = EXCLUDED.status
                "#,
            )
            .bind(item.order_uid.as_str())
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(order_uid = %record.order_uid(), "order persisted");
        Ok(())
    }

    async fn recent_order_uids_inner(&self, limit: i64) -> Result<Vec<OrderUid>> {
        let uids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT order_uid FROM orders
            ORDER BY date_created DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(uids.into_iter().map(OrderUid::new).collect())
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn get_order(&self, order_uid: &OrderUid) -> Result<OrderRecord> {
        timeout(self.op_timeout, self.get_order_inner(order_uid))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn put_order(&self, record: &OrderRecord) -> Result<()> {
        timeout(self.op_timeout, self.put_order_inner(record))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn recent_order_uids(&self, limit: i64) -> Result<Vec<OrderUid>> {
        timeout(self.op_timeout, self.recent_order_uids_inner(limit))
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
