use crate::infra::{assemble_service, build_service, http_client};
use clap::Args;
use std::sync::Arc;
use wardrobe_ai::config::AppConfig;
use wardrobe_ai::error::AppError;
use wardrobe_ai::workflows::outfit::storage::{InMemoryCatalog, InMemoryRatingStore};
use wardrobe_ai::workflows::outfit::{
    CatalogRepository, NewGarment, Outfit, OutfitSlot, Rating, RecommendationError,
    RecommendationRequest,
};

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Occasion tag to dress for (e.g. party, office)
    pub(crate) occasion: String,
    /// Only consider garments whose color contains this text
    #[arg(long)]
    pub(crate) color: Option<String>,
    /// Only consider garments whose material contains this text
    #[arg(long)]
    pub(crate) material: Option<String>,
    /// Comma-separated style keywords scored against garment images
    #[arg(long, value_delimiter = ',')]
    pub(crate) keywords: Vec<String>,
}

impl RecommendArgs {
    pub(crate) fn into_request(self) -> RecommendationRequest {
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_string)
            .collect();

        let mut request =
            RecommendationRequest::for_occasion(self.occasion).with_keywords(keywords);
        request.color = self.color;
        request.material = self.material;
        request
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Occasion used for the demo outfits
    #[arg(long, default_value = "party")]
    pub(crate) occasion: String,
    /// Comma-separated style keywords scored against garment images
    #[arg(long, value_delimiter = ',')]
    pub(crate) keywords: Vec<String>,
    /// Rating (1-5) given to the first outfit
    #[arg(long, default_value_t = 5)]
    pub(crate) rating: i64,
}

pub(crate) async fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config).await?;
    let outfit = service.compose(args.into_request()).await?;
    println!("{}", serde_json::to_string_pretty(&outfit)?);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        occasion,
        keywords,
        rating,
    } = args;
    let rating = Rating::new(rating).map_err(RecommendationError::from)?;

    let config = AppConfig::load()?;
    let catalog = InMemoryCatalog::default();
    for garment in demo_wardrobe(&occasion) {
        catalog
            .insert(garment)
            .await
            .map_err(RecommendationError::from)?;
    }
    let service = assemble_service(
        &config.remote,
        http_client(&config.remote)?,
        Arc::new(catalog),
        Arc::new(InMemoryRatingStore::default()),
    );

    println!("Outfit recommendation demo");
    println!("Occasion: {occasion}");
    if keywords.is_empty() {
        println!("Keywords: none (affinity scoring skipped)");
    } else {
        println!("Keywords: {}", keywords.join(", "));
    }

    let request = RecommendationRequest::for_occasion(occasion.as_str()).with_keywords(
        keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty()),
    );

    let first = service.compose(request.clone()).await?;
    render_outfit("\nFirst recommendation", &first);

    let receipt = service
        .record_ratings(
            first.outfit_id.clone(),
            rating,
            &first.garment_ids(),
            Some("demo-user".to_string()),
        )
        .await?;
    println!(
        "\nRated outfit {} with {} star(s); {} item rating(s) stored",
        receipt.outfit_id,
        receipt.rating,
        receipt.recorded
    );

    let second = service.compose(request).await?;
    render_outfit("\nRecommendation after rating", &second);
    if second.outfit_id == first.outfit_id {
        println!("  Same outfit selected again");
    }

    println!("\nJSON payload:\n{}", serde_json::to_string_pretty(&second)?);
    Ok(())
}

fn demo_wardrobe(occasion: &str) -> Vec<NewGarment> {
    [
        ("top", "white", "linen"),
        ("top", "black", "silk"),
        ("bottom", "navy", "denim"),
        ("bottom", "black", "wool"),
        ("dress", "red", "satin"),
        ("jacket", "camel", "wool"),
        ("footwear", "black", "leather"),
        ("footwear", "white", "canvas"),
    ]
    .into_iter()
    .map(|(category, color, material)| NewGarment {
        category: category.to_string(),
        color: color.to_string(),
        material: material.to_string(),
        occasion: occasion.to_string(),
        image_url: format!("https://wardrobe.example/uploads/{color}-{material}-{category}.jpg"),
    })
    .collect()
}

fn render_outfit(title: &str, outfit: &Outfit) {
    println!("{title}");
    println!("  Outfit id: {}", outfit.outfit_id);
    println!("  Weather: {}", outfit.weather);
    for slot in OutfitSlot::ALL {
        match outfit.items.get(&slot) {
            Some(item) => println!(
                "  {:<9} #{} {} {}",
                slot.key(),
                item.id,
                item.color,
                item.material
            ),
            None => println!("  {:<9} (no match)", slot.key()),
        }
    }
}
