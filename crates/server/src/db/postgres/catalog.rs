//! Restaurants and menu items.

use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};

use forkful_core::{MenuItemId, Price, RestaurantId, UserId};

use super::{PgStore, corrupt};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{MenuItem, MenuItemUpdate, NewMenuItem, Restaurant, RestaurantFilter};

const RESTAURANT_COLUMNS: &str = "id, owner_id, name, cuisine, delivery_time, rating, address";
const MENU_COLUMNS: &str = "id, restaurant_id, name, price, description, image_url";

#[derive(Debug, FromRow)]
struct RestaurantRow {
    id: RestaurantId,
    owner_id: UserId,
    name: String,
    cuisine: String,
    delivery_time: Option<i32>,
    rating: Decimal,
    address: Option<String>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            cuisine: row.cuisine,
            delivery_time: row.delivery_time,
            rating: row.rating,
            address: row.address,
        }
    }
}

#[derive(Debug, FromRow)]
struct MenuItemRow {
    id: MenuItemId,
    restaurant_id: RestaurantId,
    name: String,
    price: Decimal,
    description: String,
    image_url: Option<String>,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = RepositoryError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            price: Price::new(row.price).map_err(|e| corrupt("menu price", e))?,
            description: row.description,
            image_url: row.image_url,
        })
    }
}

/// Build the catalog query. Only bound parameters reach the SQL text.
fn restaurant_query(filter: &RestaurantFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {RESTAURANT_COLUMNS} FROM restaurant WHERE TRUE"
    ));
    if let Some(cuisine) = &filter.cuisine {
        qb.push(" AND cuisine = ").push_bind(cuisine.clone());
    }
    if let Some(max) = filter.max_delivery_time {
        // NULL delivery_time compares as unknown and is excluded.
        qb.push(" AND delivery_time <= ").push_bind(max);
    }
    if let Some(min) = filter.min_rating {
        qb.push(" AND rating >= ").push_bind(min);
    }
    qb.push(" ORDER BY id");
    qb
}

impl CatalogStore for PgStore {
    async fn list_restaurants(
        &self,
        filter: &RestaurantFilter,
    ) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows: Vec<RestaurantRow> = restaurant_query(filter)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Restaurant::from).collect())
    }

    async fn find_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>, RepositoryError> {
        let row: Option<RestaurantRow> = sqlx::query_as(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurant WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Restaurant::from))
    }

    async fn restaurants_owned_by(&self, owner: UserId) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows: Vec<RestaurantRow> = sqlx::query_as(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurant WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Restaurant::from).collect())
    }

    async fn menu_for(&self, restaurant: RestaurantId) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows: Vec<MenuItemRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_item WHERE restaurant_id = $1 ORDER BY id"
        ))
        .bind(restaurant)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MenuItem::try_from).collect()
    }

    async fn find_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, RepositoryError> {
        let row: Option<MenuItemRow> =
            sqlx::query_as(&format!("SELECT {MENU_COLUMNS} FROM menu_item WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(MenuItem::try_from).transpose()
    }

    async fn random_menu_items(&self, limit: u32) -> Result<Vec<MenuItem>, RepositoryError> {
        let rows: Vec<MenuItemRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_item ORDER BY random() LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MenuItem::try_from).collect()
    }

    async fn insert_menu_item(&self, new: NewMenuItem) -> Result<MenuItem, RepositoryError> {
        let row: MenuItemRow = sqlx::query_as(&format!(
            "INSERT INTO menu_item (restaurant_id, name, price, description, image_url)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(new.restaurant_id)
        .bind(&new.name)
        .bind(new.price)
        .bind(&new.description)
        .bind(&new.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;
        MenuItem::try_from(row)
    }

    async fn update_menu_item(
        &self,
        id: MenuItemId,
        update: MenuItemUpdate,
    ) -> Result<MenuItem, RepositoryError> {
        let row: Option<MenuItemRow> = sqlx::query_as(&format!(
            "UPDATE menu_item
             SET name = $2, price = $3, description = $4, image_url = $5
             WHERE id = $1
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.price)
        .bind(&update.description)
        .bind(&update.image_url)
        .fetch_optional(&self.pool)
        .await?;
        row.map_or(Err(RepositoryError::NotFound), MenuItem::try_from)
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_entry WHERE menu_item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM menu_item WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_predicates() {
        let qb = restaurant_query(&RestaurantFilter::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, owner_id, name, cuisine, delivery_time, rating, address \
             FROM restaurant WHERE TRUE ORDER BY id"
        );
    }

    #[test]
    fn test_filters_are_bound_parameters() {
        let filter = RestaurantFilter {
            cuisine: Some("thai'; DROP TABLE restaurant; --".to_owned()),
            max_delivery_time: Some(30),
            min_rating: Some(Decimal::new(45, 1)),
        };
        let qb = restaurant_query(&filter);
        let sql = qb.sql();
        assert!(sql.contains("cuisine = $1"));
        assert!(sql.contains("delivery_time <= $2"));
        assert!(sql.contains("rating >= $3"));
        assert!(!sql.contains("DROP"));
    }
}
