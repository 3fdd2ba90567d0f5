mod alignment;
mod data_loader;
