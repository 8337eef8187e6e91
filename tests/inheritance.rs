//! Single-table inheritance through the discriminator column.

mod common;

use rowhaus::prelude::*;
use tempfile::NamedTempFile;

const SCHEMA: &str = "
    CREATE TABLE vehicles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT,
        dtype TEXT
    )
";

macro_rules! vehicle_entity {
    ($name:ident, $discriminator:literal) => {
        #[derive(Debug, Clone, PartialEq)]
        struct $name {
            primary: Primary<i64>,
            label: Option<String>,
        }

        impl $name {
            fn new(label: &str) -> Self {
                Self {
                    primary: Primary::absent(),
                    label: Some(label.to_string()),
                }
            }
        }

        impl Entity for $name {
            type Key = i64;

            fn primary(&self) -> &Primary<i64> {
                &self.primary
            }

            fn primary_mut(&mut self) -> &mut Primary<i64> {
                &mut self.primary
            }
        }

        #[async_trait::async_trait]
        impl TableBinding for $name {
            fn table() -> &'static str {
                "vehicles"
            }

            fn primary_column() -> &'static str {
                "id"
            }

            fn columns() -> &'static [&'static str] {
                &["label"]
            }

            fn discriminator() -> Option<Discriminator> {
                Some(Discriminator::new("dtype", $discriminator))
            }

            fn to_params(&self) -> ParameterList {
                ParameterList::new().with(Parameter::of(self.label.clone()))
            }

            async fn from_row(
                reader: &mut RowReader<'_>,
                _ctx: &LoadContext<'_>,
            ) -> Result<Self, DaoError> {
                let key = reader.next_primary::<i64>()?;
                Ok(Self {
                    primary: key.map(Primary::from_key).unwrap_or_default(),
                    label: reader.next_text()?,
                })
            }
        }
    };
}

vehicle_entity!(Car, "Car");
vehicle_entity!(Truck, "Truck");

async fn setup_vehicles() -> (RowHaus, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let url = format!("sqlite://{}", file.path().display());
    let rowhaus = RowHaus::new(DatabaseConfig::from_url(url)).unwrap();
    rowhaus.run_script(SCHEMA).await.unwrap();
    (rowhaus, file)
}

#[tokio::test]
async fn subtypes_share_a_table_but_not_rows() {
    let (rowhaus, _db) = setup_vehicles().await;
    let cars = rowhaus.dao::<Car>();
    let trucks = rowhaus.dao::<Truck>();

    let mut car = Car::new("compact");
    cars.insert(&mut car).await.unwrap();
    let mut truck = Truck::new("hauler");
    trucks.insert(&mut truck).await.unwrap();

    // each DAO sees only its own discriminator value
    assert_eq!(cars.load_all().await.unwrap(), vec![car.clone()]);
    assert_eq!(trucks.load_all().await.unwrap(), vec![truck.clone()]);
    assert_eq!(cars.count().await.unwrap(), 1);

    // a keyed load across the hierarchy misses the other subtype
    assert!(matches!(
        cars.load(truck.key().unwrap()).await,
        Err(DaoError::NotFound(_))
    ));

    // delete honors the compound WHERE: deleting through the wrong DAO's
    // discriminator leaves the row in place
    let mut misfit = Car {
        primary: Primary::from_key(truck.key().unwrap()),
        label: truck.label.clone(),
    };
    cars.delete(&mut misfit).await.unwrap();
    assert_eq!(trucks.count().await.unwrap(), 1);

    trucks.delete(&mut truck).await.unwrap();
    assert_eq!(trucks.count().await.unwrap(), 0);
    assert_eq!(cars.count().await.unwrap(), 1);
}

#[tokio::test]
async fn update_keeps_discriminator() {
    let (rowhaus, _db) = setup_vehicles().await;
    let cars = rowhaus.dao::<Car>();

    let mut car = Car::new("before");
    cars.insert(&mut car).await.unwrap();
    car.label = Some("after".to_string());
    cars.update(&mut car).await.unwrap();

    let reloaded = cars.load(car.key().unwrap()).await.unwrap();
    assert_eq!(reloaded.label.as_deref(), Some("after"));
    assert_eq!(cars.count().await.unwrap(), 1);
}
