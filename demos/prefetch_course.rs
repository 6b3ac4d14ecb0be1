use std::sync::Arc;
use prefetcher_rs::course_cache::CourseCache;
use prefetcher_rs::download_tracker::DownloadTracker;
use prefetcher_rs::file_pool::FilePool;
use prefetcher_rs::handlers::{PagePrefetchHandler, ResourcePrefetchHandler};
use prefetcher_rs::module::{CourseModule, ModuleFile};
use prefetcher_rs::pool_configuration::FilePoolConfiguration;
use prefetcher_rs::prefetch_delegate::PrefetchDelegate;
use prefetcher_rs::prefetch_handler::PrefetchEnv;
use prefetcher_rs::site::SiteRegistry;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let sites = Arc::new(SiteRegistry::new());
    sites.set_current_site("demo-site");

    let tracker = Arc::new(DownloadTracker::new(Arc::clone(&sites)));
    let pool_config = FilePoolConfiguration::new()
        .set_root("temp/pool")
        .create_dir(true)
        .build();
    let file_pool = Arc::new(FilePool::new(pool_config));
    let course_cache = Arc::new(CourseCache::new());

    let env = PrefetchEnv::new(sites, tracker, file_pool, course_cache);
    let delegate = Arc::new(PrefetchDelegate::new(Arc::clone(&env)));
    delegate.register_handler(Arc::new(ResourcePrefetchHandler::new(Arc::clone(&env))));
    delegate.register_handler(Arc::new(PagePrefetchHandler::new(Arc::clone(&env))));

    let mut module = CourseModule::new(1, 101, "resource", "Rust book sample");
    module.contents.push(ModuleFile::new(
        "hello.html",
        "https://doc.rust-lang.org/stable/book/ch01-02-hello-world.html",
    ));

    let size = delegate.module_download_size(&module, 101, true).await.unwrap();
    println!("download size: {} bytes (total: {})", size.size, size.total);

    // Both prefetches resolve through one tracked download.
    let first = delegate.prefetch_module(&module, 101, true);
    let second = delegate.prefetch_module(&module, 101, true);
    let (first, second) = tokio::join!(first, second);
    println!("first: {:?}, second: {:?}", first, second);

    println!("status: {}", delegate.module_status(&module, 101).await);
    println!(
        "downloaded size: {} bytes",
        delegate.module_downloaded_size(&module, 101).await.unwrap()
    );
}
